use super::{Report, SectionBuilder};
use crate::record::{PatientRecord, RangeOfMotionEntry};
use chrono::{Datelike, NaiveDate};

const MEDICATION_HEADERS: [&str; 3] = ["Nombre", "Dosis", "Frecuencia"];
const ROM_HEADERS: [&str; 7] = [
    "Tipo",
    "Elevación Anterior (°)",
    "EVA",
    "GEB1",
    "EVA",
    "GEB2",
    "EVA",
];

/// Whole years between `birth_date` (`YYYY-MM-DD`, optionally followed by a
/// time) and `today`. `None` when the date cannot be read or lies in the future.
pub fn age_on(birth_date: &str, today: NaiveDate) -> Option<u32> {
    let date_part = birth_date.trim().get(..10)?;
    let birth = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;

    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

fn rom_row(entry: &RangeOfMotionEntry) -> Vec<String> {
    std::iter::once(entry.kind.label())
        .chain(entry.readings())
        .map(str::to_string)
        .collect()
}

/// Flattens `record` into the labelled sections shared by every output.
///
/// `today` is the reference date for the age field.
pub fn summarize(record: &PatientRecord, today: NaiveDate) -> Report {
    let id = &record.identity;
    let an = &record.anamnesis;
    let rf = &record.risk_factors;
    let exam = &record.physical_exam;
    let fe = &record.functional_evaluation;
    let studies = &record.studies_and_evolution;

    let age = age_on(&id.birth_date, today)
        .map(|a| a.to_string())
        .unwrap_or_default();

    let tug = if rf.tug_test_seconds.trim().is_empty() {
        String::new()
    } else {
        format!("{} seg.", rf.tug_test_seconds.trim())
    };

    let medications = record
        .medications
        .iter()
        .map(|m| vec![m.name.clone(), m.dose.clone(), m.frequency.clone()])
        .collect();

    let habits = &record.habits;

    let rom_rows = exam
        .rom
        .iter()
        .filter(|e| e.has_readings())
        .map(rom_row)
        .collect();

    let mut sections = Vec::new();

    sections.extend(
        SectionBuilder::new("Datos Personales")
            .field("Apellido", &id.last_name)
            .field("Nombres", &id.first_name)
            .field("Fecha de Nacimiento", &id.birth_date)
            .field("Edad", age)
            .field("Nacionalidad", &id.nationality)
            .field("Estado Civil", &id.civil_status)
            .field("DNI/LC/LE/CI", &id.id_number)
            .field("Obra Social", &id.insurance)
            .field("Domicilio", &id.address)
            .field("Localidad", &id.location)
            .field("Partido", &id.city)
            .field("Teléfono", &id.phone)
            .build(),
    );

    sections.extend(
        SectionBuilder::new("Anamnesis de la Lesión")
            .field("Diagnóstico Médico", &an.medical_diagnosis)
            .field("Médico Derivante", &an.referring_doctor)
            .field("Kinesiólogo", &an.kinesiologist)
            .field("Fecha de Lesión", &an.injury_date)
            .field("Causa", &an.injury_cause)
            .field("Mecanismo de Lesión", &an.lesion_mechanism)
            .field("Fecha 1ra Atención Médica", &an.first_medical_attention_date)
            .field("Lugar 1ra Atención Médica", &an.first_medical_attention_place)
            .field("MMSS Dominante", an.dominant_hand.label())
            .build(),
    );

    sections.extend(
        SectionBuilder::new("Antecedentes de Caídas")
            .field("Cantidad de caídas (últimos 6 meses)", &rf.falls_last6_months)
            .field("Lugar de la caída", &rf.fall_location)
            .field("Resultado Test \"Get Up and Go\" (TUG)", tug)
            .field("Alteraciones observadas", rf.observed_alterations().join(", "))
            .build(),
    );

    sections.extend(
        SectionBuilder::new("Ocupación")
            .field("Ocupación", &an.occupation)
            .field("Horas de Trabajo", &an.work_hours)
            .field(
                "Análisis Ocupacional (Posturas, herramientas, gestos repetitivos)",
                &an.occupation_analysis,
            )
            .build(),
    );

    sections.extend(
        SectionBuilder::new("Hobbys y Deporte")
            .field("Hobby / Deporte", &an.hobbies)
            .field("Frecuencia Semanal", &an.hobby_frequency)
            .build(),
    );

    sections.extend(
        SectionBuilder::new("Antecedentes y Tratamientos Previos")
            .field("RX/TAC/RMN/QX?", &an.studies)
            .field("Días de Internación", &an.internation_days)
            .field(
                "Osteosíntesis y Movilizaciones",
                &an.osteosynthesis_and_immobilization,
            )
            .field("Antecedentes Clínico-Quirúrgicos", &an.surgical_history)
            .build(),
    );

    sections.extend(
        SectionBuilder::new("Medicación")
            .entries(&MEDICATION_HEADERS, medications)
            .build(),
    );

    if !habits.is_empty() {
        sections.extend(
            SectionBuilder::new("Hábitos")
                .field("Tabaco - Cantidad", &habits.tobacco.quantity)
                .field("Tabaco - Frecuencia", &habits.tobacco.frequency)
                .field("Alcohol - Tipo", &habits.alcohol.kind)
                .field("Alcohol - Cantidad", &habits.alcohol.quantity)
                .field("Alcohol - Frecuencia", &habits.alcohol.frequency)
                .build(),
        );
    }

    sections.extend(
        SectionBuilder::new("Factores de Riesgo y Comorbilidades")
            .items(
                Some("Enfermedades Asociadas"),
                rf.associated_diseases.iter().map(|d| d.name.clone()).collect(),
            )
            .items(
                None,
                rf.active_labels().into_iter().map(str::to_string).collect(),
            )
            .field("Última DMO", &rf.last_dmo)
            .build(),
    );

    sections.extend(
        SectionBuilder::new("Examen Físico")
            .text(
                Some("Observaciones Generales del Paciente"),
                &exam.general_observations,
            )
            .text(Some("Inspección"), &exam.inspection_notes)
            .text(Some("Palpación y Síntomas"), &exam.palpation_and_symptoms_notes)
            .table(&ROM_HEADERS, rom_rows)
            .text(
                Some("Observaciones de ROM (compensaciones, ritmo escápulo humeral)"),
                &exam.rom_observations,
            )
            .text(Some("Cadenas Musculares"), &exam.muscle_chains)
            .build(),
    );

    let mut tests = SectionBuilder::new("Pruebas Específicas Realizadas");
    for (category, test, outcome) in record.specific_tests.performed() {
        tests = tests.field(format!("{category} - {test}"), outcome.label());
    }
    sections.extend(tests.build());

    let mut functional = SectionBuilder::new("Evaluación Funcional (Limitaciones en AVD)");
    for (activity, qualifier) in fe.limitations() {
        functional = functional.field(activity.label(), qualifier.label());
    }
    sections.extend(functional.build());

    sections.extend(
        SectionBuilder::new("Factores Contextuales")
            .field(
                "Otras actividades específicas limitadas (laboral, deporte)",
                &fe.specific_limited_activities,
            )
            .field("Factores Ambientales (e)", &fe.environmental_factors)
            .field("Factores Personales", &fe.personal_factors)
            .build(),
    );

    let mut flags = SectionBuilder::new("Banderas de Alerta");
    for (colour, note) in record.flags.entries() {
        flags = flags.field(colour.label(), note);
    }
    sections.extend(flags.build());

    let mut custom_tests = SectionBuilder::new("Pruebas Específicas Adicionales");
    for test in record.custom_tests.iter().filter(|t| t.result.is_done()) {
        custom_tests = custom_tests.field(&test.name, test.result.label());
    }
    sections.extend(custom_tests.build());

    let mut scales = SectionBuilder::new("Escalas Tomadas");
    for scale in &record.custom_scales {
        scales = scales.field(&scale.name, &scale.score);
    }
    sections.extend(scales.build());

    sections.extend(
        SectionBuilder::new("Estudios Complementarios")
            .field("RX Hombro", &studies.shoulder_rx)
            .field("RX Cervical", &studies.cervical_rx)
            .field("Otros Estudios", &studies.other_studies)
            .items(
                Some("Archivos adjuntos"),
                studies.media.iter().map(|m| m.name.clone()).collect(),
            )
            .build(),
    );

    sections.extend(
        SectionBuilder::new("Hipótesis de Diagnóstico")
            .text(None, &record.diagnostic_hypothesis)
            .build(),
    );
    sections.extend(
        SectionBuilder::new("Diagnóstico Presuntivo")
            .text(None, &record.presumptive_diagnosis)
            .build(),
    );
    sections.extend(
        SectionBuilder::new("Resumen Final y Justificación")
            .text(None, &record.final_summary)
            .build(),
    );
    sections.extend(
        SectionBuilder::new("Análisis Asistido por IA")
            .text(None, record.ai_analysis.as_deref().unwrap_or_default())
            .build(),
    );

    let patient_name = record.display_name();
    Report {
        title: format!("Ficha de Paciente: {patient_name}"),
        patient_name,
        sections,
    }
}
