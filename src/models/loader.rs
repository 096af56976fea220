//! Model artifact and feature schema loading.
//!
//! The artifact is the JSON serialization the training framework writes
//! for tree boosters: a `learner` object carrying the objective, the
//! string-encoded learner parameters, and the per-tree node arrays. Both
//! the output convention and the class layout are resolved here, once,
//! from the objective name.

use crate::encoder::FeatureSchema;
use crate::error::{PipelineError, Result};
use crate::models::ensemble::{Tree, TreeEnsemble};
use crate::models::explainer::ClassOutput;
use crate::models::inference::{logit, OutputTransform};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Deserialize)]
struct Learner {
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: Objective,
}

#[derive(Deserialize)]
struct GradientBooster {
    model: BoosterModel,
}

#[derive(Deserialize)]
struct BoosterModel {
    trees: Vec<Tree>,
}

#[derive(Deserialize)]
struct LearnerModelParam {
    // stored as strings in the artifact
    base_score: String,
    num_feature: String,
}

#[derive(Deserialize)]
struct Objective {
    name: String,
}

/// Everything resolved from one model artifact.
#[derive(Debug)]
pub struct LoadedModel {
    pub ensemble: TreeEnsemble,
    pub output: OutputTransform,
    pub class_output: ClassOutput,
    pub objective: String,
}

/// Loader for model artifacts and feature schemas.
pub struct ModelLoader;

impl ModelLoader {
    /// Load a model artifact from a file.
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<LoadedModel> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model artifact");
        let json = std::fs::read_to_string(path)?;
        Self::load_model_json(&json)
    }

    /// Load a model artifact from its JSON text.
    pub fn load_model_json(json: &str) -> Result<LoadedModel> {
        let file: ModelFile = serde_json::from_str(json)
            .map_err(|e| PipelineError::ModelLoad(format!("malformed model artifact: {e}")))?;

        let learner = file.learner;
        let objective = learner.objective.name;

        let num_features: usize = learner
            .learner_model_param
            .num_feature
            .trim()
            .parse()
            .map_err(|_| {
                PipelineError::ModelLoad(format!(
                    "invalid num_feature `{}`",
                    learner.learner_model_param.num_feature
                ))
            })?;
        let base_score: f64 = learner
            .learner_model_param
            .base_score
            .trim()
            .parse()
            .map_err(|_| {
                PipelineError::ModelLoad(format!(
                    "invalid base_score `{}`",
                    learner.learner_model_param.base_score
                ))
            })?;

        let (output, class_output) = match objective.as_str() {
            "binary:logistic" | "binary:logitraw" | "reg:logistic" => {
                (OutputTransform::Margin, ClassOutput::PerClass)
            }
            "reg:squarederror" | "reg:absoluteerror" => {
                (OutputTransform::Probability, ClassOutput::Single)
            }
            other => {
                return Err(PipelineError::ModelLoad(format!(
                    "unsupported objective `{other}`"
                )))
            }
        };

        // For margin objectives the stored base_score is a probability;
        // fold it into the margin as its log-odds.
        let base_margin = match output {
            OutputTransform::Margin => {
                if !(base_score > 0.0 && base_score < 1.0) {
                    return Err(PipelineError::ModelLoad(format!(
                        "base_score {base_score} outside (0, 1) for objective `{objective}`"
                    )));
                }
                logit(base_score)
            }
            OutputTransform::Probability => base_score,
        };

        let ensemble = TreeEnsemble::new(learner.gradient_booster.model.trees, num_features, base_margin)?;

        info!(
            objective = %objective,
            trees = ensemble.num_trees(),
            features = ensemble.num_features(),
            output = ?output,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            ensemble,
            output,
            class_output,
            objective,
        })
    }

    /// Load the ordered feature schema from a JSON array file.
    pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<FeatureSchema> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading feature schema");
        let json = std::fs::read_to_string(path)?;
        let names: Vec<String> = serde_json::from_str(&json)
            .map_err(|e| PipelineError::SchemaMismatch(format!("malformed schema file: {e}")))?;
        let schema = FeatureSchema::new(names)?;
        info!(features = schema.len(), "Feature schema loaded");
        Ok(schema)
    }
}
