//! Assessment output data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk tier classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Classify a frailty probability into a tier.
    ///
    /// Cutpoints are fixed clinical constants: above 0.8 is high, above
    /// 0.3 is medium; exactly 0.8 and 0.3 stay in the lower tier.
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.8 {
            RiskTier::High
        } else if probability > 0.3 {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    /// Banner text shown with the tier
    pub fn headline(self) -> &'static str {
        match self {
            RiskTier::High => "High risk: immediate clinical intervention advised",
            RiskTier::Medium => "Medium risk: periodic monitoring advised",
            RiskTier::Low => "Low risk: routine health management advised",
        }
    }

    /// Ordered care recommendations for the tier
    pub fn recommendations(self) -> &'static [&'static str] {
        match self {
            RiskTier::High => &[
                "Weekly follow-up monitoring",
                "Mandatory physical therapy intervention",
                "Comprehensive complication assessment",
            ],
            RiskTier::Medium => &[
                "Reassessment every 3-6 months",
                "Moderate exercise program",
                "Baseline nutritional assessment",
            ],
            RiskTier::Low => &[
                "Annual physical examination",
                "Maintain a healthy lifestyle",
                "Preventive health guidance",
            ],
        }
    }
}

/// Outcome of scoring one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Calibrated frailty probability (0.0 - 1.0)
    pub probability: f64,

    /// Predicted class: 1 = frail, 0 = not frail
    pub predicted_label: usize,

    /// Uncalibrated model margin (log-odds)
    pub raw_margin: f64,
}

/// One feature's share of an explanation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionEntry {
    /// Raw feature identifier from the schema
    pub feature: String,

    /// Encoded value that was scored
    pub value: f64,

    /// Patient-specific display label
    pub label: String,

    /// Signed contribution; positive pushes toward the explained class
    pub contribution: f64,
}

/// Additive local explanation of one prediction.
///
/// `baseline` plus the sum of entry contributions reconstructs `output`,
/// the margin of the explained class for this patient. In the frail-class
/// view (label 1) a positive contribution increases predicted risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    /// Class this explanation refers to
    pub explained_label: usize,

    /// Expected model output over the training population
    pub baseline: f64,

    /// Margin of the explained class for this patient
    pub output: f64,

    /// Per-feature contributions, in schema order
    pub entries: Vec<AttributionEntry>,
}

impl Attribution {
    /// Sum of all entry contributions.
    pub fn total_contribution(&self) -> f64 {
        self.entries.iter().map(|e| e.contribution).sum()
    }
}

/// Complete assessment returned to the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrailtyAssessment {
    /// Unique assessment identifier
    pub assessment_id: String,

    /// Associated patient record ID
    pub record_id: String,

    /// Calibrated frailty probability (0.0 - 1.0)
    pub probability: f64,

    /// Uncalibrated model margin
    pub raw_margin: f64,

    /// Predicted class: 1 = frail, 0 = not frail
    pub predicted_label: usize,

    /// Risk tier classification
    pub risk_tier: RiskTier,

    /// Banner text for the tier
    pub headline: String,

    /// Ordered care recommendations
    pub recommendations: Vec<String>,

    /// Explanation for the predicted class; absent when attribution failed
    pub attribution: Option<Attribution>,

    /// Why the explanation is unavailable, when it is
    pub attribution_error: Option<String>,

    /// Assessment generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl FrailtyAssessment {
    /// Create a new assessment from a score and its tier
    pub fn new(record_id: String, score: ScoreResult, risk_tier: RiskTier) -> Self {
        Self {
            assessment_id: uuid::Uuid::new_v4().to_string(),
            record_id,
            probability: score.probability,
            raw_margin: score.raw_margin,
            predicted_label: score.predicted_label,
            risk_tier,
            headline: risk_tier.headline().to_string(),
            recommendations: risk_tier
                .recommendations()
                .iter()
                .map(|r| r.to_string())
                .collect(),
            attribution: None,
            attribution_error: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the explanation
    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = Some(attribution);
        self
    }

    /// Record that the explanation is unavailable
    pub fn with_attribution_error(mut self, reason: String) -> Self {
        self.attribution_error = Some(reason);
        self
    }
}
