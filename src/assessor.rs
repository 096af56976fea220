//! End-to-end assessment composition.

use crate::config::AppConfig;
use crate::encoder::{FeatureEncoder, FeatureSchema};
use crate::error::{PipelineError, Result};
use crate::models::explainer::{collapse_one_hot, TreeExplainer};
use crate::models::inference::InferenceEngine;
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::types::assessment::{FrailtyAssessment, RiskTier};
use crate::types::patient::PatientRecord;
use std::sync::Arc;
use tracing::warn;

/// Owns the encoder, scorer, and explainer for the life of the process.
///
/// Built once at startup and shared immutably across workers; a single
/// assessment is pure and synchronous, so concurrent reads need no
/// locking.
#[derive(Debug)]
pub struct FrailtyAssessor {
    encoder: FeatureEncoder,
    engine: InferenceEngine,
    explainer: TreeExplainer,
}

impl FrailtyAssessor {
    /// Load the schema and model artifact and assemble the pipeline.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let schema = Arc::new(ModelLoader::load_schema(&config.model.schema_path)?);
        let model = ModelLoader::load_model(&config.model.model_path)?;
        Self::from_parts(schema, model)
    }

    /// Assemble from an already-loaded model (tests use this with
    /// in-memory artifacts).
    pub fn from_parts(schema: Arc<FeatureSchema>, model: LoadedModel) -> Result<Self> {
        let ensemble = Arc::new(model.ensemble);
        if schema.len() != ensemble.num_features() {
            return Err(PipelineError::SchemaMismatch(format!(
                "schema has {} features, model `{}` expects {}",
                schema.len(),
                model.objective,
                ensemble.num_features()
            )));
        }

        let encoder = FeatureEncoder::new(schema.clone());
        let engine = InferenceEngine::new(ensemble.clone(), model.output);
        let explainer = TreeExplainer::new(ensemble, schema, model.class_output)?;

        Ok(Self {
            encoder,
            engine,
            explainer,
        })
    }

    /// Number of features the pipeline encodes and scores.
    pub fn feature_count(&self) -> usize {
        self.encoder.schema().len()
    }

    /// Evaluate one patient record.
    ///
    /// An explainer failure downgrades to an assessment without an
    /// attribution; scoring failures propagate to the caller.
    pub fn assess(&self, record: &PatientRecord) -> Result<FrailtyAssessment> {
        let vector = self.encoder.encode(record);
        let score = self.engine.score(&vector)?;
        let tier = RiskTier::from_probability(score.probability);
        let assessment = FrailtyAssessment::new(record.record_id.clone(), score, tier);

        match self
            .explainer
            .attribute(&vector, record, score.predicted_label)
        {
            Ok(attribution) => Ok(assessment.with_attribution(collapse_one_hot(&attribution))),
            Err(e) => {
                warn!(
                    record_id = %record.record_id,
                    error = %e,
                    "Attribution unavailable, returning score only"
                );
                Ok(assessment.with_attribution_error(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::patient::{
        ActivityLevel, ComplicationCount, SitStandTime, WalkSpeed, YesNo,
    };

    const SCHEMA: &[&str] = &[
        "gender",
        "age",
        "smoking",
        "bmi",
        "fall",
        "PA_high",
        "PA_medium",
        "PA_low",
        "Complications_0",
        "Complications_1",
        "Complications_2",
        "ADL",
        "Walking_speed",
        "FTSST",
        "bl_plt",
        "bl_crea",
        "bl_cysc",
        "bl_wbc",
    ];

    /// Same shape as the shipped demo artifact: four shallow trees over
    /// the clinical schema.
    const MODEL_JSON: &str = r#"{
        "learner": {
            "gradient_booster": {
                "model": {
                    "trees": [
                        {
                            "left_children": [1, 3, 5, -1, -1, -1, -1],
                            "right_children": [2, 4, 6, -1, -1, -1, -1],
                            "split_indices": [1, 16, 13, 0, 0, 0, 0],
                            "split_conditions": [70.0, 1.2, 0.5, -1.0, 0.2, 0.3, 1.2],
                            "default_left": [1, 1, 1, 0, 0, 0, 0],
                            "sum_hessian": [100.0, 60.0, 40.0, 45.0, 15.0, 25.0, 15.0]
                        },
                        {
                            "left_children": [1, 3, -1, -1, -1],
                            "right_children": [2, 4, -1, -1, -1],
                            "split_indices": [12, 11, 0, 0, 0],
                            "split_conditions": [0.5, 0.5, -0.6, 0.1, 0.9],
                            "default_left": [1, 1, 0, 0, 0],
                            "sum_hessian": [100.0, 55.0, 45.0, 40.0, 15.0]
                        },
                        {
                            "left_children": [1, 3, -1, -1, -1],
                            "right_children": [2, 4, -1, -1, -1],
                            "split_indices": [17, 15, 0, 0, 0],
                            "split_conditions": [9.0, 90.0, 0.5, -0.4, 0.1],
                            "default_left": [1, 1, 0, 0, 0],
                            "sum_hessian": [100.0, 80.0, 20.0, 70.0, 10.0]
                        },
                        {
                            "left_children": [1, -1, 3, -1, -1],
                            "right_children": [2, -1, 4, -1, -1],
                            "split_indices": [7, 0, 4, 0, 0],
                            "split_conditions": [0.5, -0.3, 0.5, 0.2, 0.8],
                            "default_left": [1, 0, 1, 0, 0],
                            "sum_hessian": [100.0, 50.0, 50.0, 35.0, 15.0]
                        }
                    ]
                }
            },
            "learner_model_param": {"base_score": "5E-1", "num_feature": "18"},
            "objective": {"name": "binary:logistic"}
        },
        "version": [1, 7, 6]
    }"#;

    fn assessor() -> FrailtyAssessor {
        let schema = Arc::new(
            FeatureSchema::new(SCHEMA.iter().map(|n| n.to_string()).collect()).unwrap(),
        );
        let model = ModelLoader::load_model_json(MODEL_JSON).unwrap();
        FrailtyAssessor::from_parts(schema, model).unwrap()
    }

    fn frail_record() -> PatientRecord {
        PatientRecord {
            age: 80,
            cystatin_c: 1.5,
            fall_history: YesNo::Yes,
            adl_limited: YesNo::Yes,
            sit_stand_time: SitStandTime::AtLeast12,
            white_blood_cell_count: 10.0,
            creatinine: 100.0,
            ..PatientRecord::new("rec_frail".to_string(), 80, 24.0)
        }
    }

    #[test]
    fn test_intake_default_record_end_to_end() {
        let assessor = assessor();
        let record = PatientRecord::new("rec_default".to_string(), 60, 24.0);

        let assessment = assessor.assess(&record).unwrap();

        // Leaves on the default patient's paths: -1.0 + 0.1 - 0.4 + 0.2
        assert!((assessment.raw_margin - (-1.1)).abs() < 1e-9);
        assert!(assessment.probability > 0.0 && assessment.probability < 1.0);
        assert_eq!(assessment.predicted_label, 0);
        assert_eq!(
            assessment.risk_tier,
            RiskTier::from_probability(assessment.probability)
        );
        assert_eq!(assessment.risk_tier, RiskTier::Low);
        assert_eq!(assessment.recommendations.len(), 3);

        let attribution = assessment.attribution.expect("attribution present");
        assert_eq!(attribution.explained_label, 0);
        // Non-frail view: output is the negated margin.
        assert!((attribution.output - 1.1).abs() < 1e-9);
        assert!(
            (attribution.baseline + attribution.total_contribution() - attribution.output).abs()
                < 1e-4
        );
        // Two one-hot groups collapse from 18 raw columns to 14 entries.
        assert_eq!(attribution.entries.len(), 14);
    }

    #[test]
    fn test_frail_record_lands_in_high_tier() {
        let assessor = assessor();
        let assessment = assessor.assess(&frail_record()).unwrap();

        // Leaves: 1.2 + 0.9 + 0.5 + 0.8
        assert!((assessment.raw_margin - 3.4).abs() < 1e-9);
        assert_eq!(assessment.predicted_label, 1);
        assert_eq!(assessment.risk_tier, RiskTier::High);
        assert_eq!(
            assessment.headline,
            "High risk: immediate clinical intervention advised"
        );

        let attribution = assessment.attribution.expect("attribution present");
        assert_eq!(attribution.explained_label, 1);
        assert!(
            (attribution.baseline + attribution.total_contribution() - assessment.raw_margin)
                .abs()
                < 1e-4
        );
    }

    #[test]
    fn test_attribution_entries_carry_patient_labels() {
        let assessor = assessor();
        let assessment = assessor
            .assess(&PatientRecord::new("rec_default".to_string(), 60, 24.0))
            .unwrap();

        let attribution = assessment.attribution.unwrap();
        let age = attribution
            .entries
            .iter()
            .find(|e| e.feature == "age")
            .unwrap();
        assert_eq!(age.label, "Age=60");
        assert_eq!(age.value, 60.0);

        let activity = attribution
            .entries
            .iter()
            .find(|e| e.feature == "activity_level")
            .unwrap();
        assert_eq!(activity.label, "Activity=low");
    }

    #[test]
    fn test_assessments_are_deterministic() {
        let assessor = assessor();
        let record = frail_record();

        let first = assessor.assess(&record).unwrap();
        for _ in 0..10 {
            let next = assessor.assess(&record).unwrap();
            assert_eq!(next.probability, first.probability);
            assert_eq!(next.raw_margin, first.raw_margin);
            assert_eq!(next.risk_tier, first.risk_tier);
        }
    }

    #[test]
    fn test_schema_model_width_mismatch_is_fatal() {
        let schema = Arc::new(
            FeatureSchema::new(vec!["age".to_string(), "bmi".to_string()]).unwrap(),
        );
        let model = ModelLoader::load_model_json(MODEL_JSON).unwrap();
        let err = FrailtyAssessor::from_parts(schema, model).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch(_)));
    }

    #[test]
    fn test_medium_tier_record() {
        let assessor = assessor();
        // Slow gait with ADL limitation, otherwise healthy:
        // -1.0 + 0.9 - 0.4 + 0.2 = -0.3, probability ~0.426
        let record = PatientRecord {
            adl_limited: YesNo::Yes,
            ..PatientRecord::new("rec_medium".to_string(), 60, 24.0)
        };

        let assessment = assessor.assess(&record).unwrap();
        assert!((assessment.raw_margin - (-0.3)).abs() < 1e-9);
        assert_eq!(assessment.risk_tier, RiskTier::Medium);
        assert_eq!(assessment.predicted_label, 0);
        // The explanation refers to the predicted (non-frail) class.
        assert_eq!(assessment.attribution.unwrap().explained_label, 0);
    }

    #[test]
    fn test_one_hot_variants_change_margin_through_group() {
        let assessor = assessor();
        let low = PatientRecord::new("rec_low".to_string(), 60, 24.0);
        let medium = PatientRecord {
            activity_level: ActivityLevel::Medium,
            ..low.clone()
        };

        let low_assessment = assessor.assess(&low).unwrap();
        let medium_assessment = assessor.assess(&medium).unwrap();

        // Tree 3 splits on PA_low, so switching activity level moves the
        // margin: -1.1 vs -1.6 (leaf -0.3 instead of 0.2).
        assert!((low_assessment.raw_margin - (-1.1)).abs() < 1e-9);
        assert!((medium_assessment.raw_margin - (-1.6)).abs() < 1e-9);
    }

    #[test]
    fn test_complication_count_reaches_encoder() {
        // No tree splits on the complication group in this fixture, but
        // the collapsed attribution entry must still be present and
        // labeled from the record.
        let assessor = assessor();
        let record = PatientRecord {
            complication_count: ComplicationCount::TwoOrMore,
            ..PatientRecord::new("rec_c2".to_string(), 60, 24.0)
        };

        let assessment = assessor.assess(&record).unwrap();
        let attribution = assessment.attribution.unwrap();
        let complications = attribution
            .entries
            .iter()
            .find(|e| e.feature == "complication_count")
            .unwrap();
        assert_eq!(complications.label, "Complications=>=2");
        assert_eq!(complications.contribution, 0.0);
    }

    #[test]
    fn test_walk_speed_changes_tier_through_gait_tree() {
        let assessor = assessor();
        let fast = PatientRecord {
            walk_speed: WalkSpeed::AtLeast1,
            ..PatientRecord::new("rec_fast".to_string(), 60, 24.0)
        };

        // Tree 1 sends fast walkers to -0.6 instead of 0.1.
        let assessment = assessor.assess(&fast).unwrap();
        assert!((assessment.raw_margin - (-1.8)).abs() < 1e-9);
        assert_eq!(assessment.risk_tier, RiskTier::Low);
    }
}
