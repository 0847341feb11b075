//! The patient record data model.
//!
//! One [`PatientRecord`] per patient. The JSON shape is the one persisted in the
//! store and in backups: camelCase keys, identity and anamnesis fields flattened
//! into the top level, every other group nested.
//!
//! Records are plain values. An edit clones or takes the record, changes one
//! field or list, and hands the new value to the autosave controller.

mod entries;
mod exam;
mod functional;
mod history;
mod studies;

pub use entries::{add_entry, remove_entry, update_entry, Identified};
pub use exam::{
    CustomScaleResult, CustomTestResult, PhysicalExam, RangeOfMotionEntry, RomKind,
    SpecificTestCategory, SpecificTests, TestOutcome, TestResult, SPECIFIC_TEST_TAXONOMY,
};
pub use functional::{CifActivity, CifQualifier, FunctionalEvaluation, ShoulderActivity};
pub use history::{
    Alcohol, AssociatedDisease, FallAlteration, Habits, Medication, RiskFactor, RiskFactors,
    Tobacco,
};
pub use studies::{FlagColour, Flags, MediaFile, StudiesAndEvolution};

use crate::constants::{NEW_PATIENT_FIRST_NAME, NEW_PATIENT_LAST_NAME};
use chrono::{DateTime, SecondsFormat, Utc};
use kinesio_uuid::RecordId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[default]
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl RecordStatus {
    pub fn label(self) -> &'static str {
        match self {
            RecordStatus::InProgress => "En curso",
            RecordStatus::Completed => "Completada",
        }
    }
}

/// Deserializes an enumerated field, falling back to its default when the
/// stored value is not one this version knows.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value.clone()).unwrap_or_else(|_| {
        tracing::warn!("unrecognised stored value {} replaced by its default", value);
        T::default()
    }))
}

/// Dominant upper limb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DominantHand {
    #[serde(rename = "derecho")]
    Right,
    #[serde(rename = "izquierdo")]
    Left,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl DominantHand {
    /// Display label, empty when unset.
    pub fn label(self) -> &'static str {
        match self {
            DominantHand::Right => "Derecho",
            DominantHand::Left => "Izquierdo",
            DominantHand::Unset => "",
        }
    }
}

/// Identity and contact details. Plain strings; presence is the only check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub last_name: String,
    pub first_name: String,
    pub birth_date: String,
    pub nationality: String,
    pub civil_status: String,
    pub id_number: String,
    pub insurance: String,
    pub address: String,
    pub location: String,
    pub city: String,
    pub phone: String,
}

/// Occupation, hobbies and the history of the current injury.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anamnesis {
    pub occupation: String,
    pub work_hours: String,
    pub occupation_analysis: String,
    pub hobbies: String,
    pub hobby_frequency: String,

    pub medical_diagnosis: String,
    pub referring_doctor: String,
    pub kinesiologist: String,
    pub injury_date: String,
    pub injury_cause: String,
    pub first_medical_attention_date: String,
    pub first_medical_attention_place: String,
    pub lesion_mechanism: String,
    pub studies: String,
    pub internation_days: String,
    pub osteosynthesis_and_immobilization: String,
    #[serde(deserialize_with = "lenient")]
    pub dominant_hand: DominantHand,
    pub surgical_history: String,
}

/// A complete patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    /// Immutable, unique across the store.
    pub id: String,

    #[serde(flatten)]
    pub identity: Identity,
    #[serde(flatten)]
    pub anamnesis: Anamnesis,

    pub medications: Vec<Medication>,
    pub habits: Habits,
    pub risk_factors: RiskFactors,

    pub physical_exam: PhysicalExam,
    pub functional_evaluation: FunctionalEvaluation,
    pub studies_and_evolution: StudiesAndEvolution,
    pub specific_tests: SpecificTests,
    pub custom_tests: Vec<CustomTestResult>,
    pub custom_scales: Vec<CustomScaleResult>,
    pub flags: Flags,

    pub presumptive_diagnosis: String,
    pub diagnostic_hypothesis: String,
    pub final_summary: String,
    pub ai_analysis: Option<String>,

    /// ISO 8601 creation timestamp. Set once by [`PatientRecord::new_patient`].
    pub created_at: String,
    #[serde(deserialize_with = "lenient")]
    pub status: RecordStatus,
}

impl PatientRecord {
    /// The default-value template every stored record is overlaid on.
    ///
    /// `id` and `createdAt` are empty here; [`PatientRecord::new_patient`] fills them.
    pub fn template() -> Self {
        Self {
            id: String::new(),
            identity: Identity {
                first_name: NEW_PATIENT_FIRST_NAME.to_string(),
                last_name: NEW_PATIENT_LAST_NAME.to_string(),
                ..Identity::default()
            },
            anamnesis: Anamnesis::default(),
            medications: Vec::new(),
            habits: Habits::default(),
            risk_factors: RiskFactors::default(),
            physical_exam: PhysicalExam::default(),
            functional_evaluation: FunctionalEvaluation::default(),
            studies_and_evolution: StudiesAndEvolution::default(),
            specific_tests: SpecificTests::default(),
            custom_tests: Vec::new(),
            custom_scales: Vec::new(),
            flags: Flags::default(),
            presumptive_diagnosis: String::new(),
            diagnostic_hypothesis: String::new(),
            final_summary: String::new(),
            ai_analysis: None,
            created_at: String::new(),
            status: RecordStatus::InProgress,
        }
    }

    /// A brand-new record: template values, fresh id, creation time `now`.
    pub fn new_patient(now: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new().into_string(),
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            status: RecordStatus::InProgress,
            ..Self::template()
        }
    }

    /// "First Last", trimmed; empty when both names are empty.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.identity.first_name, self.identity.last_name)
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_patient_has_placeholder_names_and_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();
        let record = PatientRecord::new_patient(now);

        assert!(!record.id.is_empty());
        assert_eq!(record.created_at, "2024-03-05T10:30:00.000Z");
        assert_eq!(record.status, RecordStatus::InProgress);
        assert_eq!(record.identity.first_name, "Nuevo");
        assert_eq!(record.identity.last_name, "Paciente");
        assert_eq!(record.physical_exam.rom.len(), 2);
        assert_eq!(record.ai_analysis, None);
    }

    #[test]
    fn serialises_with_flat_identity_and_original_enum_values() {
        let mut record = PatientRecord::template();
        record.id = "1712345678901".into();
        record.anamnesis.dominant_hand = DominantHand::Right;

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "1712345678901");
        assert_eq!(value["firstName"], "Nuevo");
        assert_eq!(value["dominantHand"], "derecho");
        assert_eq!(value["status"], "In Progress");
        assert_eq!(value["aiAnalysis"], serde_json::Value::Null);
        assert_eq!(
            value["functionalEvaluation"]["combingHair"]["qualifier"],
            "Sin dificultad"
        );
        assert_eq!(
            value["specificTests"]["rotatorCuff"]["jobe"]["result"],
            "No realizado"
        );
        assert!(value.get("identity").is_none());
    }

    #[test]
    fn template_round_trips_through_json() {
        let record = PatientRecord::template();
        let json = serde_json::to_string(&record).unwrap();
        let back: PatientRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn display_name_trims_missing_parts() {
        let mut record = PatientRecord::template();
        record.identity.first_name = String::new();
        record.identity.last_name = "Pérez".into();
        assert_eq!(record.display_name(), "Pérez");
    }
}
