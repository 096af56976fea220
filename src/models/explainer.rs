//! Local attribution for individual predictions.
//!
//! Each prediction gets an additive explanation: a baseline (the expected
//! model output over the training population) plus one signed contribution
//! per feature, credited along the decision paths of the ensemble. The
//! explanation always refers to the predicted class.

use crate::encoder::{FeatureSchema, ONE_HOT_GROUPS};
use crate::error::{PipelineError, Result};
use crate::models::ensemble::TreeEnsemble;
use crate::types::assessment::{Attribution, AttributionEntry};
use crate::types::patient::{
    ActivityLevel, ComplicationCount, Gender, PatientRecord, SitStandTime, WalkSpeed, YesNo,
};
use std::sync::Arc;

/// How baselines and contributions are indexed by class, resolved once at
/// load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassOutput {
    /// One output set, already oriented toward the positive class.
    Single,
    /// Two class views. The view must be selected by the predicted label:
    /// the class-0 view is the negation of the class-1 view.
    PerClass,
}

/// Computes per-feature explanations from the loaded ensemble.
///
/// Constructed once at startup next to the inference engine and shared
/// immutably; the per-request state is only the patient's label table.
#[derive(Debug)]
pub struct TreeExplainer {
    ensemble: Arc<TreeEnsemble>,
    schema: Arc<FeatureSchema>,
    class_output: ClassOutput,
}

impl TreeExplainer {
    pub fn new(
        ensemble: Arc<TreeEnsemble>,
        schema: Arc<FeatureSchema>,
        class_output: ClassOutput,
    ) -> Result<Self> {
        if schema.len() != ensemble.num_features() {
            return Err(PipelineError::SchemaMismatch(format!(
                "schema has {} features, model expects {}",
                schema.len(),
                ensemble.num_features()
            )));
        }
        Ok(Self {
            ensemble,
            schema,
            class_output,
        })
    }

    /// Explain the prediction for `predicted_label`.
    ///
    /// Entries come back in schema order and satisfy
    /// `baseline + sum(contributions) == output`, the margin of the
    /// explained class. In the frail-class view (label 1) a positive
    /// contribution increases predicted risk.
    pub fn attribute(
        &self,
        vector: &[f64],
        record: &PatientRecord,
        predicted_label: usize,
    ) -> Result<Attribution> {
        if vector.len() != self.schema.len() {
            return Err(PipelineError::Attribution(format!(
                "feature vector has {} values, schema has {}",
                vector.len(),
                self.schema.len()
            )));
        }

        let (baseline, contributions) = self.ensemble.contributions(vector);
        let (baseline, contributions) = match self.class_output {
            ClassOutput::Single => {
                if predicted_label > 1 {
                    return Err(PipelineError::Attribution(format!(
                        "no output for class {predicted_label}"
                    )));
                }
                (baseline, contributions)
            }
            // The stored pair is the class-1 view; the class-0 view is its
            // mirror image. Selecting by label here is what keeps the
            // explanation attached to the class that was actually
            // predicted.
            ClassOutput::PerClass => match predicted_label {
                1 => (baseline, contributions),
                0 => (-baseline, contributions.iter().map(|c| -c).collect()),
                other => {
                    return Err(PipelineError::Attribution(format!(
                        "no class view for label {other}"
                    )))
                }
            },
        };

        let output = baseline + contributions.iter().sum::<f64>();
        let entries = self
            .schema
            .names()
            .iter()
            .zip(vector)
            .zip(&contributions)
            .map(|((name, &value), &contribution)| AttributionEntry {
                feature: name.clone(),
                value,
                label: display_label(name, record),
                contribution,
            })
            .collect();

        Ok(Attribution {
            explained_label: predicted_label,
            baseline,
            output,
            entries,
        })
    }
}

/// Patient-specific display label for a raw feature identifier.
///
/// Total: identifiers without a mapping fall back to the identifier
/// itself, so a schema drift degrades readability rather than failing.
pub fn display_label(feature: &str, record: &PatientRecord) -> String {
    match feature {
        "gender" => format!(
            "Gender={}",
            match record.gender {
                Gender::Female => "female",
                Gender::Male => "male",
            }
        ),
        "age" => format!("Age={}", record.age),
        "smoking" => format!("Smoking={}", yes_no(record.smoking)),
        "bmi" => format!("BMI={:.1}", record.bmi),
        "fall" => format!("Fall={}", yes_no(record.fall_history)),
        "PA_low" => format!(
            "Activity={}",
            if record.activity_level == ActivityLevel::Low {
                "low"
            } else {
                "medium/high"
            }
        ),
        "PA_medium" => format!(
            "Activity={}",
            if record.activity_level == ActivityLevel::Medium {
                "medium"
            } else {
                "low/high"
            }
        ),
        "PA_high" => format!(
            "Activity={}",
            if record.activity_level == ActivityLevel::High {
                "high"
            } else {
                "low/medium"
            }
        ),
        "Complications_0" => format!(
            "Complications={}",
            if record.complication_count == ComplicationCount::None {
                "none"
            } else {
                "some"
            }
        ),
        "Complications_1" => format!(
            "Complications={}",
            if record.complication_count == ComplicationCount::One {
                "1"
            } else {
                "0 or >=2"
            }
        ),
        "Complications_2" => format!(
            "Complications={}",
            if record.complication_count == ComplicationCount::TwoOrMore {
                ">=2"
            } else {
                "<2"
            }
        ),
        "ADL" => format!(
            "ADL={}",
            if record.adl_limited.is_yes() {
                "limited"
            } else {
                "normal"
            }
        ),
        "Walking_speed" => format!(
            "Walk={}",
            match record.walk_speed {
                WalkSpeed::AtLeast1 => ">=1m/s",
                WalkSpeed::Under1 => "<1m/s",
            }
        ),
        "FTSST" => format!(
            "SitStand={}",
            match record.sit_stand_time {
                SitStandTime::AtLeast12 => ">=12s",
                SitStandTime::Under12 => "<12s",
            }
        ),
        "bl_plt" => format!("Platelets={}", record.platelet_count),
        "bl_crea" => format!("Creatinine={:.1}", record.creatinine),
        "bl_cysc" => format!("CystatinC={:.1}", record.cystatin_c),
        "bl_wbc" => format!("WBC={:.1}", record.white_blood_cell_count),
        other => other.to_string(),
    }
}

fn yes_no(value: YesNo) -> &'static str {
    if value.is_yes() {
        "yes"
    } else {
        "no"
    }
}

/// Merge one-hot indicator entries into one entry per logical field.
///
/// The merged contribution is the sum of the group members', so the
/// additive reconstruction of the output is unchanged. The label comes
/// from the active indicator.
pub fn collapse_one_hot(attribution: &Attribution) -> Attribution {
    let mut entries: Vec<AttributionEntry> = Vec::with_capacity(attribution.entries.len());
    let mut consumed = vec![false; attribution.entries.len()];

    for (index, entry) in attribution.entries.iter().enumerate() {
        if consumed[index] {
            continue;
        }

        let group = ONE_HOT_GROUPS
            .iter()
            .find(|(_, members)| members.contains(&entry.feature.as_str()));

        match group {
            Some((field, members)) => {
                let member_indices: Vec<usize> = attribution
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| members.contains(&e.feature.as_str()))
                    .map(|(i, _)| i)
                    .collect();

                let contribution = member_indices
                    .iter()
                    .map(|&i| attribution.entries[i].contribution)
                    .sum();
                let active = member_indices
                    .iter()
                    .map(|&i| &attribution.entries[i])
                    .find(|e| e.value == 1.0);

                entries.push(AttributionEntry {
                    feature: (*field).to_string(),
                    value: active.map(|e| e.value).unwrap_or(0.0),
                    label: active
                        .map(|e| e.label.clone())
                        .unwrap_or_else(|| (*field).to_string()),
                    contribution,
                });
                for i in member_indices {
                    consumed[i] = true;
                }
            }
            None => {
                consumed[index] = true;
                entries.push(entry.clone());
            }
        }
    }

    Attribution {
        explained_label: attribution.explained_label,
        baseline: attribution.baseline,
        output: attribution.output,
        entries,
    }
}
