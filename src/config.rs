//! Configuration management for the assessment pipeline

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub io: IoConfig,
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the serialized tree-ensemble artifact
    pub model_path: String,
    /// Path to the ordered feature-schema JSON array
    pub schema_path: String,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent evaluation workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

/// Record intake and assessment output configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IoConfig {
    /// JSONL record source; stdin when unset
    #[serde(default)]
    pub input_path: Option<String>,
    /// JSONL assessment sink; stdout when unset
    #[serde(default)]
    pub output_path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

fn default_workers() -> usize {
    4
}

fn default_report_interval() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                model_path: "models/frailty_xgb.json".to_string(),
                schema_path: "models/feature_schema.json".to_string(),
            },
            pipeline: PipelineConfig {
                workers: default_workers(),
                report_interval_secs: default_report_interval(),
            },
            io: IoConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
