//! Default-template merge applied on every read path.
//!
//! Stored data is overlaid on the current [`PatientRecord::template`], so
//! records written by older versions gain the fields added since. Stored
//! values always win. Nested objects are merged key by key instead of being
//! replaced wholesale. A stored `null` reads as `""` for text fields and keeps
//! the template value for anything else. Arrays are values, not templates, and
//! replace; their entries fill missing fields from their own defaults.

use crate::record::PatientRecord;
use crate::{PatientError, PatientResult};
use serde_json::Value;

/// Overlays `stored` on `base` and returns the merged value.
pub fn merge_value(base: &Value, stored: &Value) -> Value {
    match (base, stored) {
        (Value::Object(base_map), Value::Object(stored_map)) => {
            let mut merged = base_map.clone();
            for (key, stored_value) in stored_map {
                let value = match base_map.get(key) {
                    Some(base_value) => merge_value(base_value, stored_value),
                    None => stored_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (Value::String(_), Value::Null) => Value::String(String::new()),
        (base, Value::Null) if !base.is_null() => base.clone(),
        (_, stored) => stored.clone(),
    }
}

/// The `id` of a stored entry, if it has a usable one.
pub fn stored_id(entry: &Value) -> Option<&str> {
    entry
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
}

/// Shapes one stored entry into a complete record.
///
/// # Errors
///
/// - [`PatientError::InvalidInput`] if the entry is not an object with a non-empty string `id`.
/// - [`PatientError::Deserialization`] if a stored value has the wrong type for its field.
pub fn merge_defaults(stored: &Value) -> PatientResult<PatientRecord> {
    if !stored.is_object() {
        return Err(PatientError::InvalidInput(
            "stored record is not an object".into(),
        ));
    }
    if stored_id(stored).is_none() {
        return Err(PatientError::InvalidInput(
            "stored record has no id".into(),
        ));
    }

    let template =
        serde_json::to_value(PatientRecord::template()).map_err(PatientError::Serialization)?;
    let merged = merge_value(&template, stored);
    serde_json::from_value(merged).map_err(PatientError::Deserialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CifQualifier, Flags};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn legacy_record_without_flags_gets_default_flags() {
        let stored = json!({
            "id": "1700000000000",
            "firstName": "Juan",
            "lastName": "Pérez",
            "createdAt": "2023-11-14T22:13:20.000Z",
            "status": "Completed"
        });

        let record = merge_defaults(&stored).expect("legacy record should merge");
        assert_eq!(record.flags, Flags::default());
        assert_eq!(record.identity.first_name, "Juan");
        assert_eq!(record.created_at, "2023-11-14T22:13:20.000Z");
        assert_eq!(record.physical_exam.rom.len(), 2);
    }

    #[test]
    fn nested_sections_are_backfilled_key_by_key() {
        let stored = json!({
            "id": "a1",
            "flags": { "red": "dolor nocturno" },
            "functionalEvaluation": { "washingBack": { "qualifier": "Dificultad grave" } }
        });

        let record = merge_defaults(&stored).expect("merge");
        assert_eq!(record.flags.red, "dolor nocturno");
        assert_eq!(record.flags.pink, "");
        assert_eq!(
            record.functional_evaluation.washing_back.qualifier,
            CifQualifier::Severe
        );
        assert_eq!(record.functional_evaluation.washing_back.details, "");
    }

    #[test]
    fn stored_null_text_reads_as_empty_and_stored_arrays_replace() {
        let stored = json!({
            "id": "a1",
            "firstName": null,
            "flags": null,
            "aiAnalysis": null,
            "physicalExam": { "rom": [] }
        });

        let record = merge_defaults(&stored).expect("merge");
        assert_eq!(record.identity.first_name, "");
        assert_eq!(record.identity.last_name, "Paciente");
        assert_eq!(record.flags, Flags::default());
        assert_eq!(record.ai_analysis, None);
        assert!(record.physical_exam.rom.is_empty());
    }

    #[test]
    fn entries_without_id_are_rejected() {
        assert!(matches!(
            merge_defaults(&json!({ "firstName": "x" })),
            Err(PatientError::InvalidInput(_))
        ));
        assert!(matches!(
            merge_defaults(&json!([1, 2])),
            Err(PatientError::InvalidInput(_))
        ));
    }

    #[test]
    fn wrong_field_type_is_a_deserialization_error() {
        let stored = json!({ "id": "a1", "medications": "none" });
        assert!(matches!(
            merge_defaults(&stored),
            Err(PatientError::Deserialization(_))
        ));
    }

    fn stored_entry() -> impl Strategy<Value = Value> {
        let key = prop::sample::select(vec![
            "firstName",
            "lastName",
            "flags",
            "habits",
            "riskFactors",
            "aiAnalysis",
            "unknownLegacyField",
        ]);
        let leaf = prop_oneof![
            Just(Value::Null),
            "[a-z ]{0,8}".prop_map(Value::String),
            any::<bool>().prop_map(Value::Bool),
            "[a-z]{0,5}".prop_map(|s| json!({ "red": s, "menopause": true })),
        ];
        prop::collection::btree_map(key, leaf, 0..6).prop_map(|fields| {
            let mut map: serde_json::Map<String, Value> = fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
            map.insert("id".into(), json!("p1"));
            Value::Object(map)
        })
    }

    proptest! {
        #[test]
        fn merging_twice_equals_merging_once(stored in stored_entry()) {
            let template = serde_json::to_value(PatientRecord::template()).unwrap();
            let once = merge_value(&template, &stored);
            let twice = merge_value(&template, &once);
            prop_assert_eq!(once, twice);
        }
    }
}
