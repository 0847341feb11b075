//! AI-assisted clinical analysis.
//!
//! [`build_prompt`] renders the clinically relevant parts of a record as
//! markdown. The language model behind [`AnalysisProvider`] is an opaque
//! collaborator; [`AnalysisService`] only stores what it returns.

use crate::record::{PatientRecord, RomKind};
use crate::store::PatientStore;
use crate::{PatientError, PatientResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Standing instruction sent with every analysis request.
pub const SYSTEM_INSTRUCTION: &str = "\
Eres un asistente experto en kinesiología de hombro. Analiza los datos de la ficha \
del paciente y genera un análisis clínico estructurado según la Clasificación \
Internacional del Funcionamiento (CIF), con estas secciones: Resumen Clínico Inicial; \
Análisis según la CIF (A: Funciones y Estructuras Corporales, B: Actividades, \
C: Participación, D: Factores Contextuales con Barreras y Facilitadores); \
Banderas de Alerta; Sugerencias para la Exploración. Conecta explícitamente cada \
deficiencia con las limitaciones y restricciones que provoca, usa terminología \
kinesiológica precisa y no propongas tratamiento.";

const PROMPT_LEAD: &str =
    "Por favor, analiza los siguientes datos del paciente y genera un reporte estructurado según la CIF:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub system_instruction: &'static str,
    pub prompt: String,
}

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Returns the generated analysis text.
    async fn generate(&self, request: &AnalysisRequest) -> PatientResult<String>;
}

/// Flattens free text onto one markdown line and stops it opening a heading.
fn inline(value: &str) -> String {
    let joined = value.split_whitespace().collect::<Vec<_>>().join(" ");
    match joined.strip_prefix('#') {
        Some(rest) => format!("\\#{rest}"),
        None => joined,
    }
}

fn bullet(lines: &mut Vec<String>, label: &str, value: &str) {
    if !value.trim().is_empty() {
        lines.push(format!("- **{label}:** {}", inline(value)));
    }
}

/// The patient data part of the prompt, as markdown sections.
pub fn build_prompt(record: &PatientRecord) -> String {
    let mut lines = Vec::new();
    let rf = &record.risk_factors;
    let exam = &record.physical_exam;
    let fe = &record.functional_evaluation;

    lines.push("### Datos Personales y Anamnesis".to_string());
    bullet(&mut lines, "Nombre", &record.display_name());
    bullet(&mut lines, "Diagnóstico Médico", &record.anamnesis.medical_diagnosis);
    bullet(&mut lines, "Causa de Lesión", &record.anamnesis.injury_cause);
    bullet(&mut lines, "Mecanismo de Lesión", &record.anamnesis.lesion_mechanism);
    bullet(&mut lines, "Antecedentes", &record.anamnesis.surgical_history);
    let diseases: Vec<&str> = rf.associated_diseases.iter().map(|d| d.name.as_str()).collect();
    bullet(&mut lines, "Enfermedades Asociadas", &diseases.join(", "));
    let factors = rf.active_labels();
    let factors = if factors.is_empty() {
        "Ninguno destacable".to_string()
    } else {
        factors.join(", ")
    };
    bullet(&mut lines, "Factores de Riesgo", &factors);

    lines.push(String::new());
    lines.push("### Examen Físico".to_string());
    bullet(&mut lines, "Observaciones Generales", &exam.general_observations);
    bullet(&mut lines, "Inspección", &exam.inspection_notes);
    bullet(&mut lines, "Palpación y Síntomas", &exam.palpation_and_symptoms_notes);
    for entry in exam.rom.iter().filter(|e| e.has_readings()) {
        let label = match entry.kind {
            RomKind::Active => "ROM Activo",
            RomKind::Passive => "ROM Pasivo",
        };
        let value = format!(
            "elevación {}° (EVA {}), GEB1 {} (EVA {}), GEB2 {} (EVA {})",
            entry.elevation,
            entry.elevation_eva,
            entry.geb1,
            entry.geb1_eva,
            entry.geb2,
            entry.geb2_eva
        );
        bullet(&mut lines, label, &value);
    }

    let performed = record.specific_tests.performed();
    if !performed.is_empty() {
        lines.push(String::new());
        lines.push("### Pruebas Específicas (Protocolo Estándar)".to_string());
        for (_, test, outcome) in performed {
            bullet(&mut lines, &test, outcome.label());
        }
    }

    let custom: Vec<_> = record
        .custom_tests
        .iter()
        .filter(|t| t.result.is_done())
        .collect();
    if !custom.is_empty() {
        lines.push(String::new());
        lines.push("### Pruebas Específicas (Adicionales)".to_string());
        for test in custom {
            bullet(&mut lines, &test.name, test.result.label());
        }
    }

    let flags = record.flags.entries();
    if !flags.is_empty() {
        lines.push(String::new());
        lines.push("### Banderas de Alerta Identificadas".to_string());
        for (colour, note) in flags {
            bullet(&mut lines, colour.label(), note);
        }
    }

    lines.push(String::new());
    lines.push("### Evaluación Funcional (Limitaciones en Actividades - según el paciente)".to_string());
    let limitations = fe.limitations();
    if limitations.is_empty() {
        lines.push(
            "- No se reportan limitaciones significativas en actividades de la vida diaria."
                .to_string(),
        );
    }
    for (activity, qualifier) in limitations {
        let details = fe.activity(activity).details.trim();
        let value = if details.is_empty() {
            qualifier.label().to_string()
        } else {
            format!("{} ({details})", qualifier.label())
        };
        bullet(&mut lines, activity.label(), &value);
    }
    bullet(
        &mut lines,
        "Otras actividades específicas limitadas",
        &fe.specific_limited_activities,
    );
    bullet(&mut lines, "Factores Ambientales", &fe.environmental_factors);
    bullet(&mut lines, "Factores Personales", &fe.personal_factors);

    let studies = &record.studies_and_evolution;
    let mut study_lines = Vec::new();
    bullet(&mut study_lines, "Hallazgos RX Hombro", &studies.shoulder_rx);
    bullet(&mut study_lines, "Hallazgos RX Cervical", &studies.cervical_rx);
    bullet(&mut study_lines, "Otros Estudios", &studies.other_studies);
    if !study_lines.is_empty() {
        lines.push(String::new());
        lines.push("### Estudios y Evolución".to_string());
        lines.extend(study_lines);
    }

    if !record.presumptive_diagnosis.trim().is_empty() {
        lines.push(String::new());
        lines.push("### Diagnóstico Presuntivo (del Kinesiólogo)".to_string());
        lines.push(record.presumptive_diagnosis.trim().to_string());
    }

    lines.join("\n")
}

pub fn build_request(record: &PatientRecord) -> AnalysisRequest {
    AnalysisRequest {
        system_instruction: SYSTEM_INSTRUCTION,
        prompt: format!("{PROMPT_LEAD}\n\n{}", build_prompt(record)),
    }
}

#[derive(Clone)]
pub struct AnalysisService {
    store: PatientStore,
    provider: Arc<dyn AnalysisProvider>,
}

impl AnalysisService {
    pub fn new(store: PatientStore, provider: Arc<dyn AnalysisProvider>) -> Self {
        Self { store, provider }
    }

    /// Generates an analysis for the record `id`, stores it in `aiAnalysis`
    /// and saves the record.
    ///
    /// # Errors
    ///
    /// - [`PatientError::NotFound`] if there is no such record.
    /// - [`PatientError::Analysis`] if the provider fails or returns nothing;
    ///   the stored record is left as it was.
    pub async fn analyse(&self, id: &str) -> PatientResult<PatientRecord> {
        let mut record = self
            .store
            .get(id)
            .ok_or_else(|| PatientError::NotFound(id.to_string()))?;

        let text = self
            .provider
            .generate(&build_request(&record))
            .await
            .inspect_err(|e| tracing::error!("analysis of patient {} failed: {}", id, e))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(PatientError::Analysis("provider returned no text".into()));
        }

        record.ai_analysis = Some(text.to_string());
        self.store.save(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::record::{CifQualifier, FlagColour, ShoulderActivity, TestOutcome};
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct CannedProvider {
        reply: Result<String, String>,
        seen: Mutex<Vec<AnalysisRequest>>,
    }

    impl CannedProvider {
        fn new(reply: Result<String, String>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AnalysisProvider for CannedProvider {
        async fn generate(&self, request: &AnalysisRequest) -> PatientResult<String> {
            self.seen.lock().expect("lock").push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(PatientError::Analysis(e.clone())),
            }
        }
    }

    fn store() -> PatientStore {
        let cfg = CoreConfig::with_data_dir(PathBuf::from("unused")).expect("config");
        PatientStore::in_memory(Arc::new(cfg))
    }

    #[test]
    fn prompt_lists_only_clinically_relevant_content() {
        let mut record = PatientRecord::template();
        record.id = "p1".into();
        record.anamnesis.medical_diagnosis = "Tendinopatía\nsupraespinoso".into();
        record.risk_factors.diabetes = true;
        record
            .specific_tests
            .set_outcome("subacromialConflict", "hawkinsKennedy", TestOutcome::Positive);
        record.flags.set(FlagColour::Yellow, "miedo al movimiento");
        record
            .functional_evaluation
            .activity_mut(ShoulderActivity::ReachingHighShelf)
            .qualifier = CifQualifier::Severe;

        let prompt = build_prompt(&record);
        assert!(prompt.starts_with("### Datos Personales y Anamnesis"));
        assert!(prompt.contains("- **Diagnóstico Médico:** Tendinopatía supraespinoso"));
        assert!(prompt.contains("- **Factores de Riesgo:** Diabetes"));
        assert!(prompt.contains("- **Hawkins-Kennedy:** Positivo"));
        assert!(prompt.contains("- **Bandera Amarilla:** miedo al movimiento"));
        assert!(prompt.contains("- **Alcanzar un objeto en un estante alto:** Dificultad grave"));
        assert!(!prompt.contains("Estudios y Evolución"));
        assert!(!prompt.contains("Adicionales"));
    }

    #[test]
    fn prompt_reports_absence_of_limitations() {
        let mut record = PatientRecord::template();
        record.id = "p1".into();
        let prompt = build_prompt(&record);
        assert!(prompt.contains("No se reportan limitaciones significativas"));
        assert!(prompt.contains("Ninguno destacable"));
    }

    #[test]
    fn free_text_cannot_open_a_heading() {
        assert_eq!(inline("# título\n  falso"), "\\# título falso");
    }

    #[tokio::test]
    async fn analyse_stores_trimmed_text() {
        let store = store();
        let record = store.create().expect("create");
        let provider = Arc::new(CannedProvider::new(Ok("  Resumen Clínico Inicial  ".into())));
        let service = AnalysisService::new(store.clone(), provider.clone());

        let updated = service.analyse(&record.id).await.expect("analyse");
        assert_eq!(updated.ai_analysis.as_deref(), Some("Resumen Clínico Inicial"));
        assert_eq!(
            store.get(&record.id).expect("stored").ai_analysis,
            updated.ai_analysis
        );

        let seen = provider.seen.lock().expect("lock");
        assert_eq!(seen[0].system_instruction, SYSTEM_INSTRUCTION);
        assert!(seen[0].prompt.starts_with(PROMPT_LEAD));
    }

    #[tokio::test]
    async fn provider_failure_leaves_record_untouched() {
        let store = store();
        let record = store.create().expect("create");
        let provider = Arc::new(CannedProvider::new(Err("quota".into())));
        let service = AnalysisService::new(store.clone(), provider);

        assert!(matches!(
            service.analyse(&record.id).await,
            Err(PatientError::Analysis(_))
        ));
        assert_eq!(store.get(&record.id), Some(record.clone()));

        let blank = AnalysisService::new(store.clone(), Arc::new(CannedProvider::new(Ok("  ".into()))));
        assert!(matches!(
            blank.analyse(&record.id).await,
            Err(PatientError::Analysis(_))
        ));
        assert!(matches!(
            blank.analyse("missing").await,
            Err(PatientError::NotFound(_))
        ));
        assert_eq!(store.get(&record.id), Some(record));
    }
}
