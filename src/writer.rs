//! Assessment output for the batch shell

use crate::error::Result;
use crate::types::assessment::FrailtyAssessment;
use std::path::PathBuf;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Writes assessments as JSON lines to a file or stdout
pub struct AssessmentWriter {
    sink: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl AssessmentWriter {
    /// Create a writer for a file path, or stdout when `None`
    pub async fn create(target: Option<PathBuf>) -> Result<Self> {
        let sink: Box<dyn AsyncWrite + Send + Unpin> = match target {
            Some(path) => Box::new(tokio::fs::File::create(&path).await?),
            None => Box::new(tokio::io::stdout()),
        };
        Ok(Self {
            sink: Mutex::new(sink),
        })
    }

    /// Serialize and write one assessment
    pub async fn publish(&self, assessment: &FrailtyAssessment) -> Result<()> {
        let mut line = serde_json::to_vec(assessment)?;
        line.push(b'\n');

        let mut sink = self.sink.lock().await;
        sink.write_all(&line).await?;
        sink.flush().await?;

        debug!(
            assessment_id = %assessment.assessment_id,
            record_id = %assessment.record_id,
            probability = assessment.probability,
            "Assessment written"
        );

        Ok(())
    }

    /// Write multiple assessments, logging and continuing on failure
    pub async fn publish_batch(&self, assessments: &[FrailtyAssessment]) -> Result<()> {
        for assessment in assessments {
            if let Err(e) = self.publish(assessment).await {
                error!(
                    assessment_id = %assessment.assessment_id,
                    error = %e,
                    "Failed to write assessment"
                );
            }
        }
        Ok(())
    }
}
