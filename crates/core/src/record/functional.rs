//! Functional evaluation graded with ICF (CIF) qualifiers.

use super::lenient;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CifQualifier {
    #[default]
    #[serde(rename = "Sin dificultad")]
    NoDifficulty,
    #[serde(rename = "Dificultad ligera")]
    Mild,
    #[serde(rename = "Dificultad moderada")]
    Moderate,
    #[serde(rename = "Dificultad grave")]
    Severe,
    #[serde(rename = "Dificultad completa")]
    Complete,
    #[serde(rename = "No aplicable")]
    NotApplicable,
}

impl CifQualifier {
    pub fn label(self) -> &'static str {
        match self {
            CifQualifier::NoDifficulty => "Sin dificultad",
            CifQualifier::Mild => "Dificultad ligera",
            CifQualifier::Moderate => "Dificultad moderada",
            CifQualifier::Severe => "Dificultad grave",
            CifQualifier::Complete => "Dificultad completa",
            CifQualifier::NotApplicable => "No aplicable",
        }
    }

    /// Whether the qualifier describes an actual limitation.
    pub fn is_limitation(self) -> bool {
        !matches!(self, CifQualifier::NoDifficulty | CifQualifier::NotApplicable)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CifActivity {
    #[serde(deserialize_with = "lenient")]
    pub qualifier: CifQualifier,
    pub details: String,
}

/// The seven graded daily-living activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShoulderActivity {
    CombingHair,
    WashingBack,
    ReachingHighShelf,
    FasteningBehindBack,
    PuttingOnJacket,
    CarryingHeavyObject,
    SleepingOnAffectedSide,
}

impl ShoulderActivity {
    pub const ALL: [ShoulderActivity; 7] = [
        ShoulderActivity::CombingHair,
        ShoulderActivity::WashingBack,
        ShoulderActivity::ReachingHighShelf,
        ShoulderActivity::FasteningBehindBack,
        ShoulderActivity::PuttingOnJacket,
        ShoulderActivity::CarryingHeavyObject,
        ShoulderActivity::SleepingOnAffectedSide,
    ];

    /// The JSON key of the activity inside `functionalEvaluation`.
    pub fn key(self) -> &'static str {
        match self {
            ShoulderActivity::CombingHair => "combingHair",
            ShoulderActivity::WashingBack => "washingBack",
            ShoulderActivity::ReachingHighShelf => "reachingHighShelf",
            ShoulderActivity::FasteningBehindBack => "fasteningBehindBack",
            ShoulderActivity::PuttingOnJacket => "puttingOnJacket",
            ShoulderActivity::CarryingHeavyObject => "carryingHeavyObject",
            ShoulderActivity::SleepingOnAffectedSide => "sleepingOnAffectedSide",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShoulderActivity::CombingHair => "Peinarse o lavarse el pelo",
            ShoulderActivity::WashingBack => "Lavarse la espalda",
            ShoulderActivity::ReachingHighShelf => "Alcanzar un objeto en un estante alto",
            ShoulderActivity::FasteningBehindBack => "Abrocharse por la espalda",
            ShoulderActivity::PuttingOnJacket => "Ponerse una chaqueta o abrigo",
            ShoulderActivity::CarryingHeavyObject => "Llevar un objeto pesado (ej. bolsa)",
            ShoulderActivity::SleepingOnAffectedSide => "Dormir sobre el lado afectado",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.key() == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionalEvaluation {
    pub combing_hair: CifActivity,
    pub washing_back: CifActivity,
    pub reaching_high_shelf: CifActivity,
    pub fastening_behind_back: CifActivity,
    pub putting_on_jacket: CifActivity,
    pub carrying_heavy_object: CifActivity,
    pub sleeping_on_affected_side: CifActivity,

    pub specific_limited_activities: String,
    pub environmental_factors: String,
    pub personal_factors: String,
}

impl FunctionalEvaluation {
    pub fn activity(&self, activity: ShoulderActivity) -> &CifActivity {
        match activity {
            ShoulderActivity::CombingHair => &self.combing_hair,
            ShoulderActivity::WashingBack => &self.washing_back,
            ShoulderActivity::ReachingHighShelf => &self.reaching_high_shelf,
            ShoulderActivity::FasteningBehindBack => &self.fastening_behind_back,
            ShoulderActivity::PuttingOnJacket => &self.putting_on_jacket,
            ShoulderActivity::CarryingHeavyObject => &self.carrying_heavy_object,
            ShoulderActivity::SleepingOnAffectedSide => &self.sleeping_on_affected_side,
        }
    }

    pub fn activity_mut(&mut self, activity: ShoulderActivity) -> &mut CifActivity {
        match activity {
            ShoulderActivity::CombingHair => &mut self.combing_hair,
            ShoulderActivity::WashingBack => &mut self.washing_back,
            ShoulderActivity::ReachingHighShelf => &mut self.reaching_high_shelf,
            ShoulderActivity::FasteningBehindBack => &mut self.fastening_behind_back,
            ShoulderActivity::PuttingOnJacket => &mut self.putting_on_jacket,
            ShoulderActivity::CarryingHeavyObject => &mut self.carrying_heavy_object,
            ShoulderActivity::SleepingOnAffectedSide => &mut self.sleeping_on_affected_side,
        }
    }

    /// Activities graded with an actual limitation, in display order.
    pub fn limitations(&self) -> Vec<(ShoulderActivity, CifQualifier)> {
        ShoulderActivity::ALL
            .into_iter()
            .map(|a| (a, self.activity(a).qualifier))
            .filter(|(_, q)| q.is_limitation())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_keys_match_serialised_field_names() {
        let value = serde_json::to_value(FunctionalEvaluation::default()).unwrap();
        for activity in ShoulderActivity::ALL {
            assert!(value.get(activity.key()).is_some(), "{}", activity.key());
            assert_eq!(ShoulderActivity::from_key(activity.key()), Some(activity));
        }
    }

    #[test]
    fn limitations_skip_no_difficulty_and_not_applicable() {
        let mut eval = FunctionalEvaluation::default();
        eval.activity_mut(ShoulderActivity::WashingBack).qualifier = CifQualifier::Severe;
        eval.activity_mut(ShoulderActivity::CombingHair).qualifier = CifQualifier::NotApplicable;
        eval.sleeping_on_affected_side.qualifier = CifQualifier::Mild;

        assert_eq!(
            eval.limitations(),
            vec![
                (ShoulderActivity::WashingBack, CifQualifier::Severe),
                (ShoulderActivity::SleepingOnAffectedSide, CifQualifier::Mild),
            ]
        );
    }

    #[test]
    fn qualifier_uses_original_wording() {
        let json = serde_json::to_string(&CifQualifier::Complete).unwrap();
        assert_eq!(json, "\"Dificultad completa\"");
    }
}
