//! Patient record data structures for frailty risk assessment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Biological sex of the patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// Dichotomous clinical answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    No,
    Yes,
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

/// Self-reported physical activity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
}

/// Number of comorbid complications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplicationCount {
    None,
    One,
    TwoOrMore,
}

/// Four-metre walk speed, dichotomized at 1 m/s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalkSpeed {
    #[serde(rename = "under_1ms")]
    Under1,
    #[serde(rename = "at_least_1ms")]
    AtLeast1,
}

/// Five-times sit-to-stand duration, dichotomized at 12 s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SitStandTime {
    #[serde(rename = "under_12s")]
    Under12,
    #[serde(rename = "at_least_12s")]
    AtLeast12,
}

/// A knee-osteoarthritis patient's clinical measurements, as supplied by
/// the intake layer. Bounds (age 0-120, BMI 10.0-50.0, platelets 0-1000,
/// creatinine 0.0-1000.0, cystatin C 0.0-10.0, WBC 0.0-50.0) are
/// validated by the caller before the record is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Unique record identifier
    #[serde(alias = "ID")]
    pub record_id: String,

    pub gender: Gender,

    /// Age in years
    pub age: u32,

    /// Current smoker
    pub smoking: YesNo,

    /// Body mass index, kg/m^2
    pub bmi: f64,

    /// Fall within the past year
    #[serde(alias = "fall")]
    pub fall_history: YesNo,

    #[serde(alias = "activity")]
    pub activity_level: ActivityLevel,

    #[serde(alias = "complications")]
    pub complication_count: ComplicationCount,

    /// Limitation in activities of daily living
    #[serde(alias = "adl")]
    pub adl_limited: YesNo,

    pub walk_speed: WalkSpeed,

    pub sit_stand_time: SitStandTime,

    /// Platelet count, 10^9/L
    #[serde(alias = "platelet")]
    pub platelet_count: u32,

    /// Serum creatinine, umol/L
    #[serde(alias = "crea")]
    pub creatinine: f64,

    /// Cystatin C, mg/L
    #[serde(alias = "cysc")]
    pub cystatin_c: f64,

    /// White blood cell count, 10^9/L
    #[serde(alias = "wbc")]
    pub white_blood_cell_count: f64,

    /// Timestamp (optional, for batch processing)
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl PatientRecord {
    /// Create a record seeded with the clinic intake defaults.
    pub fn new(record_id: String, age: u32, bmi: f64) -> Self {
        Self {
            record_id,
            gender: Gender::Female,
            age,
            smoking: YesNo::No,
            bmi,
            fall_history: YesNo::No,
            activity_level: ActivityLevel::Low,
            complication_count: ComplicationCount::None,
            adl_limited: YesNo::No,
            walk_speed: WalkSpeed::Under1,
            sit_stand_time: SitStandTime::Under12,
            platelet_count: 200,
            creatinine: 70.0,
            cystatin_c: 1.0,
            white_blood_cell_count: 6.0,
            timestamp: Utc::now(),
        }
    }
}
