//! Type definitions for the frailty assessment pipeline

pub mod assessment;
pub mod patient;

pub use assessment::{Attribution, FrailtyAssessment, RiskTier, ScoreResult};
pub use patient::PatientRecord;
