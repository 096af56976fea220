//! Frailty Risk Pipeline Library
//!
//! Scores knee-osteoarthritis patient records with a gradient-boosted
//! tree model, calibrates the output into a frailty probability, maps it
//! to a risk tier with care recommendations, and explains every
//! prediction with additive per-feature contributions.

pub mod assessor;
pub mod config;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod models;
pub mod reader;
pub mod types;
pub mod writer;

pub use assessor::FrailtyAssessor;
pub use config::AppConfig;
pub use encoder::{FeatureEncoder, FeatureSchema};
pub use error::{PipelineError, Result};
pub use models::inference::InferenceEngine;
pub use reader::RecordReader;
pub use types::{assessment::FrailtyAssessment, patient::PatientRecord};
pub use writer::AssessmentWriter;
