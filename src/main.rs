//! Frailty Risk Pipeline - Main Entry Point
//!
//! Reads patient records as JSON lines, runs model inference and
//! attribution, and writes frailty assessments. Records are evaluated in
//! parallel; the model and explainer are built once and shared.

use anyhow::Result;
use frailty_risk_pipeline::{
    assessor::FrailtyAssessor,
    config::AppConfig,
    metrics::{MetricsReporter, PipelineMetrics},
    reader::RecordReader,
    types::assessment::RiskTier,
    types::patient::PatientRecord,
    writer::AssessmentWriter,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("frailty_risk_pipeline=info".parse()?),
        )
        .init();

    info!("Starting frailty risk pipeline");

    let config = AppConfig::load()?;
    let metrics = Arc::new(PipelineMetrics::new());

    // The schema, model, and explainer load once; everything after this
    // point only reads them.
    let assessor = Arc::new(FrailtyAssessor::from_config(&config)?);
    info!(features = assessor.feature_count(), "Assessment pipeline ready");

    let reader = RecordReader::from_path(config.io.input_path.clone().map(PathBuf::from));
    let writer = Arc::new(
        AssessmentWriter::create(config.io.output_path.clone().map(PathBuf::from)).await?,
    );

    let reporter = MetricsReporter::new(
        metrics.clone(),
        Duration::from_secs(config.pipeline.report_interval_secs),
    );
    tokio::spawn(reporter.run());

    let workers = config.pipeline.workers;
    info!(workers, "Evaluating records");

    let semaphore = Arc::new(Semaphore::new(workers));
    let mut lines = reader.lines().await?;
    let mut tasks = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let permit = semaphore.clone().acquire_owned().await?;
        let assessor = assessor.clone();
        let writer = writer.clone();
        let metrics = metrics.clone();

        tasks.push(tokio::spawn(async move {
            let _permit = permit;
            evaluate_line(&line, &assessor, &writer, &metrics).await;
        }));
    }

    for task in tasks {
        let _ = task.await;
    }

    info!("Input drained, shutting down");
    metrics.log_summary();

    Ok(())
}

/// Parse, assess, and write one input line.
async fn evaluate_line(
    line: &str,
    assessor: &FrailtyAssessor,
    writer: &AssessmentWriter,
    metrics: &PipelineMetrics,
) {
    let record: PatientRecord = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "Skipping undecodable patient record");
            return;
        }
    };

    let started = Instant::now();
    let assessment = match assessor.assess(&record) {
        Ok(assessment) => assessment,
        Err(e) => {
            error!(record_id = %record.record_id, error = %e, "Assessment failed");
            return;
        }
    };
    let elapsed = started.elapsed();

    metrics.observe(
        elapsed,
        assessment.probability,
        assessment.risk_tier,
        assessment.attribution.is_some(),
    );

    if let Err(e) = writer.publish(&assessment).await {
        error!(
            record_id = %assessment.record_id,
            error = %e,
            "Failed to write assessment"
        );
        return;
    }

    if assessment.risk_tier == RiskTier::Low {
        debug!(
            record_id = %assessment.record_id,
            probability = assessment.probability,
            elapsed_us = elapsed.as_micros() as u64,
            "Assessment written"
        );
    } else {
        info!(
            record_id = %assessment.record_id,
            probability = assessment.probability,
            risk_tier = ?assessment.risk_tier,
            elapsed_us = elapsed.as_micros() as u64,
            "Assessment written"
        );
    }

    let assessed = metrics.assessed();
    if assessed % 100 == 0 {
        info!(
            assessed,
            throughput = format!("{:.1} rec/s", metrics.throughput()),
            mean_latency_us = metrics.latency_stats().mean_us,
            "Processing milestone"
        );
    }
}
