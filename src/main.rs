use std::env::args;
use std::str::FromStr;
use std::string::ToString;
use std::thread::scope;
use std::time::Duration;

use log::LevelFilter;
use strum::IntoEnumIterator;
use strum_macros::{self, Display, EnumIter, EnumString};

use download_pipeline::pipeline::{Pipeline, PipelineConfig, PipelineError};

fn main() -> Result<(), String> {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    args()
        .nth(1)
        .ok_or(format!(
            "no demo supplied, use one of {} or see unit tests",
            Demo::iter()
                .map(|d| d.to_string())
                .collect::<Vec<String>>()
                .join(",")
        ))
        .and_then(|selector| {
            Demo::from_str(&selector)
                .map_err(|e| e.to_string())
                .and_then(|demo| {
                    match demo {
                        Demo::Download => download(),
                        Demo::RacingStart => racing_start(),
                        Demo::LateReaders => late_readers(),
                    }
                    .map_err(|e| e.to_string())
                })
        })
}

#[derive(EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
enum Demo {
    Download,
    RacingStart,
    LateReaders,
}

/// the reference run: 5 blocks at 2s apiece, full-speed reporting
fn download() -> Result<(), PipelineError> {
    let report = Pipeline::new(PipelineConfig::default()).run()?;
    println!(
        "downloaded {} bytes in {} blocks: {}",
        report.content.len(),
        report.version,
        report.content
    );
    println!("progress reports: {:?}", report.observed_lengths);
    Ok(())
}

/// same pipeline, fast timings, random start order - completion is leveled,
/// so no interleaving can make a worker hang
fn racing_start() -> Result<(), PipelineError> {
    let config = PipelineConfig {
        fetch_latency: Duration::from_millis(50),
        progress_timeout: Duration::from_millis(100),
        completion_poll: Duration::from_millis(5),
        consumer_delay: Duration::from_millis(10),
        start_jitter: Some(Duration::from_millis(100)),
        ..PipelineConfig::default()
    };
    for round in 1..=10 {
        let report = Pipeline::new(config.clone()).run()?;
        println!(
            "round {round}: {} progress reports, {} bytes",
            report.observed_lengths.len(),
            report.content.len()
        );
    }
    Ok(())
}

/// readers that only start waiting after the download already ended still
/// observe completion immediately
fn late_readers() -> Result<(), PipelineError> {
    let config = PipelineConfig {
        fetch_latency: Duration::from_millis(50),
        progress_timeout: Duration::from_millis(100),
        completion_poll: Duration::from_millis(5),
        consumer_delay: Duration::from_millis(10),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config);
    let state = pipeline.state();
    let report = pipeline.run()?;
    println!("download over: {}", report.content);

    scope(|s| {
        for reader in 0..3 {
            let state = &state;
            s.spawn(move || {
                state.await_finished();
                let (content, version) = state.payload();
                println!(
                    "late reader {reader} got {} bytes at version {version}",
                    content.len()
                );
            });
        }
    });
    Ok(())
}
