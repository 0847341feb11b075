//! Medication, habits and risk factors.

use super::entries::Identified;
use kinesio_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dose: String,
    pub frequency: String,
}

impl Medication {
    pub fn new(
        name: impl Into<String>,
        dose: impl Into<String>,
        frequency: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new().into_string(),
            name: name.into(),
            dose: dose.into(),
            frequency: frequency.into(),
        }
    }
}

impl Identified for Medication {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociatedDisease {
    pub id: String,
    pub name: String,
}

impl AssociatedDisease {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RecordId::new().into_string(),
            name: name.into(),
        }
    }
}

impl Identified for AssociatedDisease {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tobacco {
    pub quantity: String,
    pub frequency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alcohol {
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: String,
    pub frequency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habits {
    pub tobacco: Tobacco,
    pub alcohol: Alcohol,
}

impl Habits {
    pub fn is_empty(&self) -> bool {
        self.tobacco == Tobacco::default() && self.alcohol == Alcohol::default()
    }
}

/// Comorbidities and clinical risk indicators, one checkbox each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskFactor {
    Menopause,
    Osteopenia,
    Dmo,
    FrequentFalls,
    Barbiturates,
    Neoplasms,
    Infections,
    SncDisease,
    VascularDisease,
    Diabetes,
    Dsr,
    Hypothyroidism,
    Hyperthyroidism,
    Hyperlipidemia,
    Dupuytren,
    SweatyHands,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 16] = [
        RiskFactor::Menopause,
        RiskFactor::Osteopenia,
        RiskFactor::Dmo,
        RiskFactor::FrequentFalls,
        RiskFactor::Barbiturates,
        RiskFactor::Neoplasms,
        RiskFactor::Infections,
        RiskFactor::SncDisease,
        RiskFactor::VascularDisease,
        RiskFactor::Diabetes,
        RiskFactor::Dsr,
        RiskFactor::Hypothyroidism,
        RiskFactor::Hyperthyroidism,
        RiskFactor::Hyperlipidemia,
        RiskFactor::Dupuytren,
        RiskFactor::SweatyHands,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RiskFactor::Menopause => "Menopausia",
            RiskFactor::Osteopenia => "Osteopenia/porosis",
            RiskFactor::Dmo => "DMO",
            RiskFactor::FrequentFalls => "Caídas Frecuentes",
            RiskFactor::Barbiturates => "Barbitúricos",
            RiskFactor::Neoplasms => "Neoplasias",
            RiskFactor::Infections => "Infecciones",
            RiskFactor::SncDisease => "Enf. del SNC/Periféricas",
            RiskFactor::VascularDisease => "Alt/Qx Vascular",
            RiskFactor::Diabetes => "Diabetes",
            RiskFactor::Dsr => "DSR",
            RiskFactor::Hypothyroidism => "Hipotiroidismo",
            RiskFactor::Hyperthyroidism => "Hipertiroidismo",
            RiskFactor::Hyperlipidemia => "Hiperlipidemia",
            RiskFactor::Dupuytren => "Dupuytren",
            RiskFactor::SweatyHands => "Manos Transpiran",
        }
    }
}

/// Signs observed during the fall-risk assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallAlteration {
    Postural,
    Gait,
    MuscleWeakness,
    DecreasedReflexes,
    Visual,
}

impl FallAlteration {
    pub const ALL: [FallAlteration; 5] = [
        FallAlteration::Postural,
        FallAlteration::Gait,
        FallAlteration::MuscleWeakness,
        FallAlteration::DecreasedReflexes,
        FallAlteration::Visual,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FallAlteration::Postural => "Alteraciones posturales",
            FallAlteration::Gait => "Alteración de la marcha",
            FallAlteration::MuscleWeakness => "Debilidad muscular asociada",
            FallAlteration::DecreasedReflexes => "Disminución de los reflejos",
            FallAlteration::Visual => "Alteraciones visuales",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    pub associated_diseases: Vec<AssociatedDisease>,
    pub menopause: bool,
    pub osteopenia: bool,
    pub dmo: bool,
    pub last_dmo: String,
    pub frequent_falls: bool,
    pub falls_last6_months: String,
    pub barbiturates: bool,
    pub neoplasms: bool,
    pub infections: bool,
    pub snc_disease: bool,
    pub vascular_disease: bool,
    pub diabetes: bool,
    pub dsr: bool,
    pub hypothyroidism: bool,
    pub hyperthyroidism: bool,
    pub hyperlipidemia: bool,
    pub dupuytren: bool,
    pub sweaty_hands: bool,

    pub fall_location: String,
    pub postural_alterations: bool,
    pub gait_alteration: bool,
    pub associated_muscle_weakness: bool,
    pub decreased_reflexes: bool,
    pub visual_alterations: bool,
    pub tug_test_seconds: String,
}

impl RiskFactors {
    pub fn is_set(&self, factor: RiskFactor) -> bool {
        match factor {
            RiskFactor::Menopause => self.menopause,
            RiskFactor::Osteopenia => self.osteopenia,
            RiskFactor::Dmo => self.dmo,
            RiskFactor::FrequentFalls => self.frequent_falls,
            RiskFactor::Barbiturates => self.barbiturates,
            RiskFactor::Neoplasms => self.neoplasms,
            RiskFactor::Infections => self.infections,
            RiskFactor::SncDisease => self.snc_disease,
            RiskFactor::VascularDisease => self.vascular_disease,
            RiskFactor::Diabetes => self.diabetes,
            RiskFactor::Dsr => self.dsr,
            RiskFactor::Hypothyroidism => self.hypothyroidism,
            RiskFactor::Hyperthyroidism => self.hyperthyroidism,
            RiskFactor::Hyperlipidemia => self.hyperlipidemia,
            RiskFactor::Dupuytren => self.dupuytren,
            RiskFactor::SweatyHands => self.sweaty_hands,
        }
    }

    pub fn has_alteration(&self, alteration: FallAlteration) -> bool {
        match alteration {
            FallAlteration::Postural => self.postural_alterations,
            FallAlteration::Gait => self.gait_alteration,
            FallAlteration::MuscleWeakness => self.associated_muscle_weakness,
            FallAlteration::DecreasedReflexes => self.decreased_reflexes,
            FallAlteration::Visual => self.visual_alterations,
        }
    }

    /// Labels of the risk factors that are set, in display order.
    pub fn active_labels(&self) -> Vec<&'static str> {
        RiskFactor::ALL
            .into_iter()
            .filter(|f| self.is_set(*f))
            .map(RiskFactor::label)
            .collect()
    }

    /// Labels of the fall alterations that were observed, in display order.
    pub fn observed_alterations(&self) -> Vec<&'static str> {
        FallAlteration::ALL
            .into_iter()
            .filter(|a| self.has_alteration(*a))
            .map(FallAlteration::label)
            .collect()
    }
}
