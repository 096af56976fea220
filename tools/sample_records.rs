//! Sample Patient Record Generator
//!
//! Generates plausible patient records as JSON lines on stdout for
//! exercising the pipeline without clinical data.

use chrono::Utc;
use frailty_risk_pipeline::types::patient::{
    ActivityLevel, ComplicationCount, Gender, PatientRecord, SitStandTime, WalkSpeed, YesNo,
};
use rand::Rng;
use std::time::Duration;
use tracing::info;

/// Patient record generator for testing
struct RecordGenerator {
    rng: rand::rngs::ThreadRng,
    record_counter: u64,
}

impl RecordGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            record_counter: 0,
        }
    }

    /// Generate a random robust (low-risk) patient
    fn generate_robust(&mut self) -> PatientRecord {
        self.record_counter += 1;

        PatientRecord {
            record_id: format!("rec_{:08}", self.record_counter),
            gender: if self.rng.gen_bool(0.5) {
                Gender::Female
            } else {
                Gender::Male
            },
            age: self.rng.gen_range(45..66),
            smoking: if self.rng.gen_bool(0.15) {
                YesNo::Yes
            } else {
                YesNo::No
            },
            bmi: self.rng.gen_range(20.0..27.0),
            fall_history: YesNo::No,
            activity_level: if self.rng.gen_bool(0.5) {
                ActivityLevel::Medium
            } else {
                ActivityLevel::High
            },
            complication_count: ComplicationCount::None,
            adl_limited: YesNo::No,
            walk_speed: WalkSpeed::AtLeast1,
            sit_stand_time: SitStandTime::Under12,
            platelet_count: self.rng.gen_range(150..350),
            creatinine: self.rng.gen_range(50.0..90.0),
            cystatin_c: self.rng.gen_range(0.6..1.1),
            white_blood_cell_count: self.rng.gen_range(4.0..8.0),
            timestamp: Utc::now(),
        }
    }

    /// Generate a frail-profile patient
    fn generate_frail(&mut self) -> PatientRecord {
        self.record_counter += 1;

        PatientRecord {
            record_id: format!("rec_{:08}", self.record_counter),
            gender: if self.rng.gen_bool(0.6) {
                Gender::Female
            } else {
                Gender::Male
            },
            age: self.rng.gen_range(72..91), // Advanced age
            smoking: if self.rng.gen_bool(0.4) {
                YesNo::Yes
            } else {
                YesNo::No
            },
            bmi: self.rng.gen_range(17.0..32.0),
            fall_history: if self.rng.gen_bool(0.7) {
                YesNo::Yes
            } else {
                YesNo::No
            },
            activity_level: ActivityLevel::Low, // Sedentary
            complication_count: if self.rng.gen_bool(0.5) {
                ComplicationCount::TwoOrMore
            } else {
                ComplicationCount::One
            },
            adl_limited: YesNo::Yes,
            walk_speed: WalkSpeed::Under1,           // Slow gait
            sit_stand_time: SitStandTime::AtLeast12, // Slow sit-to-stand
            platelet_count: self.rng.gen_range(100..300),
            creatinine: self.rng.gen_range(80.0..150.0),
            cystatin_c: self.rng.gen_range(1.2..2.5), // Reduced renal function
            white_blood_cell_count: self.rng.gen_range(8.0..12.0),
            timestamp: Utc::now(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr; stdout carries the generated records
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_records=info".parse()?),
        )
        .init();

    info!("Starting Sample Patient Record Generator");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);
    let frail_rate: f64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.3);
    let delay_ms: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0);

    info!(
        count = count,
        frail_rate = frail_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let mut generator = RecordGenerator::new();
    let mut rng = rand::thread_rng();

    let mut robust_count = 0;
    let mut frail_count = 0;

    for i in 0..count {
        let record = if rng.gen_bool(frail_rate) {
            frail_count += 1;
            generator.generate_frail()
        } else {
            robust_count += 1;
            generator.generate_robust()
        };

        println!("{}", serde_json::to_string(&record)?);

        if (i + 1) % 10 == 0 {
            info!(
                "Generated {}/{} records ({} robust, {} frail-profile)",
                i + 1,
                count,
                robust_count,
                frail_count
            );
        }

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    info!(
        "Completed! Generated {} records ({} robust, {} frail-profile)",
        count, robust_count, frail_count
    );

    Ok(())
}
