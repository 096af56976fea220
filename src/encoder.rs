//! Feature encoding for frailty model inference.
//!
//! This module expands a patient record into the fixed ordered vector the
//! model was trained on, matching the preprocessing of the training
//! pipeline. The scorer reads the vector positionally, so column order is
//! the schema's order, always.

use crate::error::{PipelineError, Result};
use crate::types::patient::{
    ActivityLevel, ComplicationCount, Gender, PatientRecord, SitStandTime, WalkSpeed,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// One-hot groups produced by the encoder, keyed by logical input field.
pub const ONE_HOT_GROUPS: &[(&str, &[&str])] = &[
    ("activity_level", &["PA_low", "PA_medium", "PA_high"]),
    (
        "complication_count",
        &["Complications_0", "Complications_1", "Complications_2"],
    ),
];

/// Ordered list of the feature names the model expects.
///
/// Loaded once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Validate and wrap an ordered feature-name list.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(PipelineError::SchemaMismatch("schema is empty".to_string()));
        }
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "duplicate feature name `{name}`"
                )));
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Column index of a feature name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Encodes patient records into model feature vectors.
///
/// Boolean-like fields use a fixed polarity: `gender` is 1 for female,
/// `smoking`/`fall`/`ADL` are 1 for yes/limited, `Walking_speed` is 1 for
/// at least 1 m/s, and `FTSST` is 1 for at least 12 s. Activity level and
/// complication count expand to one-hot indicator groups.
#[derive(Debug)]
pub struct FeatureEncoder {
    schema: Arc<FeatureSchema>,
}

impl FeatureEncoder {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encode a record into the schema's column order.
    ///
    /// Schema entries the encoder does not compute are set to 0, and each
    /// fallback is logged so a drifted schema cannot pass unnoticed.
    pub fn encode(&self, record: &PatientRecord) -> Vec<f64> {
        let computed = Self::computed_values(record);
        let mut vector = Vec::with_capacity(self.schema.len());

        for name in self.schema.names() {
            match computed.iter().find(|(key, _)| *key == name.as_str()) {
                Some((_, value)) => vector.push(*value),
                None => {
                    debug!(
                        feature = %name,
                        "schema feature not produced by encoder, defaulting to 0"
                    );
                    vector.push(0.0);
                }
            }
        }

        vector
    }

    /// The (feature, value) pairs computed from a record.
    fn computed_values(record: &PatientRecord) -> Vec<(&'static str, f64)> {
        vec![
            ("gender", indicator(record.gender == Gender::Female)),
            ("age", f64::from(record.age)),
            ("smoking", indicator(record.smoking.is_yes())),
            ("bmi", record.bmi),
            ("fall", indicator(record.fall_history.is_yes())),
            (
                "PA_high",
                indicator(record.activity_level == ActivityLevel::High),
            ),
            (
                "PA_medium",
                indicator(record.activity_level == ActivityLevel::Medium),
            ),
            (
                "PA_low",
                indicator(record.activity_level == ActivityLevel::Low),
            ),
            (
                "Complications_0",
                indicator(record.complication_count == ComplicationCount::None),
            ),
            (
                "Complications_1",
                indicator(record.complication_count == ComplicationCount::One),
            ),
            (
                "Complications_2",
                indicator(record.complication_count == ComplicationCount::TwoOrMore),
            ),
            ("ADL", indicator(record.adl_limited.is_yes())),
            (
                "Walking_speed",
                indicator(record.walk_speed == WalkSpeed::AtLeast1),
            ),
            (
                "FTSST",
                indicator(record.sit_stand_time == SitStandTime::AtLeast12),
            ),
            ("bl_plt", f64::from(record.platelet_count)),
            ("bl_crea", record.creatinine),
            ("bl_cysc", record.cystatin_c),
            ("bl_wbc", record.white_blood_cell_count),
        ]
    }
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}
