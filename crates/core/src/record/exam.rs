//! Physical exam, range of motion and the specific-test battery.

use super::entries::Identified;
use super::lenient;
use kinesio_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RomKind {
    #[default]
    Active,
    Passive,
}

impl RomKind {
    pub fn label(self) -> &'static str {
        match self {
            RomKind::Active => "Activo",
            RomKind::Passive => "Pasivo",
        }
    }
}

/// Elevation angle and pain (EVA) readings at three checkpoints.
///
/// Fields missing from a stored entry read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangeOfMotionEntry {
    pub id: String,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: RomKind,
    pub elevation: String,
    pub elevation_eva: String,
    pub geb1: String,
    pub geb1_eva: String,
    pub geb2: String,
    pub geb2_eva: String,
}

impl RangeOfMotionEntry {
    pub fn empty(id: &str, kind: RomKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            elevation: String::new(),
            elevation_eva: String::new(),
            geb1: String::new(),
            geb1_eva: String::new(),
            geb2: String::new(),
            geb2_eva: String::new(),
        }
    }

    pub fn readings(&self) -> [&str; 6] {
        [
            &self.elevation,
            &self.elevation_eva,
            &self.geb1,
            &self.geb1_eva,
            &self.geb2,
            &self.geb2_eva,
        ]
    }

    pub fn has_readings(&self) -> bool {
        self.readings().iter().any(|r| !r.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalExam {
    pub general_observations: String,
    pub inspection_notes: String,
    pub palpation_and_symptoms_notes: String,
    pub muscle_chains: String,
    pub rom: Vec<RangeOfMotionEntry>,
    pub rom_observations: String,
}

impl Default for PhysicalExam {
    fn default() -> Self {
        Self {
            general_observations: String::new(),
            inspection_notes: String::new(),
            palpation_and_symptoms_notes: String::new(),
            muscle_chains: String::new(),
            rom: vec![
                RangeOfMotionEntry::empty("1", RomKind::Active),
                RangeOfMotionEntry::empty("2", RomKind::Passive),
            ],
            rom_observations: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestOutcome {
    #[default]
    #[serde(rename = "No realizado")]
    NotDone,
    #[serde(rename = "Positivo")]
    Positive,
    #[serde(rename = "Negativo")]
    Negative,
}

impl TestOutcome {
    pub fn label(self) -> &'static str {
        match self {
            TestOutcome::NotDone => "No realizado",
            TestOutcome::Positive => "Positivo",
            TestOutcome::Negative => "Negativo",
        }
    }

    pub fn is_done(self) -> bool {
        self != TestOutcome::NotDone
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestResult {
    #[serde(deserialize_with = "lenient")]
    pub result: TestOutcome,
}

/// One category of the fixed test battery: `(key, label, tests)`, each test `(key, label)`.
pub type SpecificTestCategory = (&'static str, &'static str, &'static [(&'static str, &'static str)]);

/// The fixed specific-test taxonomy, in display order.
pub const SPECIFIC_TEST_TAXONOMY: &[SpecificTestCategory] = &[
    (
        "subacromialConflict",
        "Conflicto Subacromial",
        &[
            ("arcoDoloroso", "Arco Doloroso"),
            ("neer", "Neer"),
            ("hawkinsKennedy", "Hawkins-Kennedy"),
            ("yocum", "Yocum"),
        ],
    ),
    (
        "rotatorCuff",
        "Manguito Rotador",
        &[
            ("jobe", "Jobe"),
            ("brazoCaido", "Brazo Caído"),
            ("gerberLiftOff", "Gerber (Lift-Off)"),
            ("napoleon", "Napoleón"),
        ],
    ),
    (
        "instability",
        "Inestabilidad",
        &[
            ("aprension", "Aprensión"),
            ("cajonAnterior", "Cajón Anterior"),
            ("signoSurco", "Signo del Surco"),
        ],
    ),
    (
        "acromioclavicularJoint",
        "Articulación Acromioclavicular",
        &[("palpacionAAC", "Palpación AAC"), ("obrien", "O'Brien")],
    ),
    (
        "cervicalRadiculopathy",
        "Radiculopatía Cervical",
        &[
            ("spurling", "Spurling"),
            ("distraccion", "Distracción"),
            ("tensionMMSS", "Tensión MMSS (ULTT)"),
        ],
    ),
];

/// Results of the fixed test battery, keyed by category then test.
///
/// Stored as nested JSON objects. Keys outside the taxonomy are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecificTests(BTreeMap<String, BTreeMap<String, TestResult>>);

impl Default for SpecificTests {
    fn default() -> Self {
        let categories = SPECIFIC_TEST_TAXONOMY
            .iter()
            .map(|(category, _, tests)| {
                let tests = tests
                    .iter()
                    .map(|(test, _)| (test.to_string(), TestResult::default()))
                    .collect();
                (category.to_string(), tests)
            })
            .collect();
        Self(categories)
    }
}

impl SpecificTests {
    pub fn outcome(&self, category: &str, test: &str) -> Option<TestOutcome> {
        self.0
            .get(category)
            .and_then(|tests| tests.get(test))
            .map(|r| r.result)
    }

    pub fn set_outcome(&mut self, category: &str, test: &str, outcome: TestOutcome) {
        self.0
            .entry(category.to_string())
            .or_default()
            .insert(test.to_string(), TestResult { result: outcome });
    }

    /// Tests that were performed, as `(category label, test label, outcome)`.
    ///
    /// Taxonomy tests come first in taxonomy order; unknown keys follow, labelled by key.
    pub fn performed(&self) -> Vec<(String, String, TestOutcome)> {
        let mut out = Vec::new();

        for (category, category_label, tests) in SPECIFIC_TEST_TAXONOMY {
            for (test, test_label) in tests.iter() {
                if let Some(outcome) = self.outcome(category, test).filter(|o| o.is_done()) {
                    out.push((category_label.to_string(), test_label.to_string(), outcome));
                }
            }
        }

        for (category, tests) in &self.0 {
            let known = SPECIFIC_TEST_TAXONOMY
                .iter()
                .find(|(key, _, _)| key == category);
            for (test, result) in tests {
                let is_known = known
                    .map(|(_, _, list)| list.iter().any(|(key, _)| key == test))
                    .unwrap_or(false);
                if !is_known && result.result.is_done() {
                    let category_label = known.map(|(_, label, _)| *label).unwrap_or(category);
                    out.push((category_label.to_string(), test.clone(), result.result));
                }
            }
        }

        out
    }
}

/// A test outside the fixed battery, named by the clinician.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomTestResult {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub result: TestOutcome,
}

impl CustomTestResult {
    pub fn new(name: impl Into<String>, result: TestOutcome) -> Self {
        Self {
            id: RecordId::new().into_string(),
            name: name.into(),
            result,
        }
    }
}

impl Identified for CustomTestResult {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A functional scale score (e.g. SPADI, DASH) recorded as free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomScaleResult {
    pub id: String,
    pub name: String,
    pub score: String,
}

impl CustomScaleResult {
    pub fn new(name: impl Into<String>, score: impl Into<String>) -> Self {
        Self {
            id: RecordId::new().into_string(),
            name: name.into(),
            score: score.into(),
        }
    }
}

impl Identified for CustomScaleResult {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_battery_covers_taxonomy_as_not_done() {
        let tests = SpecificTests::default();
        for (category, _, list) in SPECIFIC_TEST_TAXONOMY {
            for (test, _) in list.iter() {
                assert_eq!(tests.outcome(category, test), Some(TestOutcome::NotDone));
            }
        }
        assert!(tests.performed().is_empty());
    }

    #[test]
    fn performed_follows_taxonomy_order_and_skips_not_done() {
        let mut tests = SpecificTests::default();
        tests.set_outcome("cervicalRadiculopathy", "spurling", TestOutcome::Negative);
        tests.set_outcome("subacromialConflict", "neer", TestOutcome::Positive);

        let performed = tests.performed();
        assert_eq!(performed.len(), 2);
        assert_eq!(performed[0].1, "Neer");
        assert_eq!(performed[0].2, TestOutcome::Positive);
        assert_eq!(performed[1].0, "Radiculopatía Cervical");
    }

    #[test]
    fn unknown_tests_are_reported_by_key() {
        let mut tests = SpecificTests::default();
        tests.set_outcome("rotatorCuff", "bellyPress", TestOutcome::Positive);
        let performed = tests.performed();
        assert_eq!(
            performed,
            vec![(
                "Manguito Rotador".to_string(),
                "bellyPress".to_string(),
                TestOutcome::Positive
            )]
        );
    }

    #[test]
    fn rom_entry_uses_original_keys() {
        let value = serde_json::to_value(RangeOfMotionEntry::empty("1", RomKind::Active)).unwrap();
        assert_eq!(value["type"], "active");
        assert!(value.get("elevationEva").is_some());
        assert!(value.get("geb1Eva").is_some());
    }

    #[test]
    fn rom_entry_without_values_has_no_readings() {
        let mut entry = RangeOfMotionEntry::empty("1", RomKind::Passive);
        assert!(!entry.has_readings());
        entry.geb2 = "45".into();
        assert!(entry.has_readings());
    }
}
