//! # Download pipeline
//!
//! The three-party simulated download: a fetcher appends chunks to the
//! shared buffer while a progress reporter follows the length, and a
//! processor takes the finished payload at the end. One [DownloadState] is
//! built here and handed to all three workers by [Arc]; the run ends only
//! after every worker has terminated.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::{thread_rng, Rng};
use thiserror::Error;

use crate::coordination::DownloadState;

mod consumer;
mod observer;
mod producer;

/// Tunables for one run. The defaults are the simulated-download timings;
/// tests shrink them to keep runs fast. The two observer timeouts trade
/// CPU against detection latency, they are not correctness parameters.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// how many chunks the fetcher appends
    pub chunk_count: u32,
    /// simulated network latency before each chunk
    pub fetch_latency: Duration,
    /// upper bound for one progress wait
    pub progress_timeout: Duration,
    /// length of the completion check between progress waits
    pub completion_poll: Duration,
    /// the processor is "not ready" for this long at the start
    pub consumer_delay: Duration,
    /// random extra start delay per worker, to shake up which thread
    /// reaches its first wait before which notify
    pub start_jitter: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_count: 5,
            fetch_latency: Duration::from_secs(2),
            progress_timeout: Duration::from_secs(2),
            completion_poll: Duration::from_millis(10),
            consumer_delay: Duration::from_millis(200),
            start_jitter: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to spawn the {role} thread")]
    Spawn {
        role: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("the {role} thread panicked")]
    WorkerPanicked { role: &'static str },
}

/// What a finished run looked like.
#[derive(Debug)]
pub struct RunReport {
    /// lengths in the order the reporter saw them; non-decreasing, and a
    /// length may repeat when a progress wait timed out near the end
    pub observed_lengths: Vec<usize>,
    /// the full payload, as read by the processor after completion
    pub content: String,
    /// buffer version at the end - one bump per appended chunk
    pub version: u64,
}

pub struct Pipeline {
    state: Arc<DownloadState>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            state: Arc::new(DownloadState::new()),
            config,
        }
    }

    /// Shared handle to the coordination state, e.g. to attach extra
    /// readers next to the built-in three workers.
    pub fn state(&self) -> Arc<DownloadState> {
        Arc::clone(&self.state)
    }

    /// Spawn the fetcher, the progress reporter and the processor, then
    /// wait for all three to terminate.
    pub fn run(self) -> Result<RunReport, PipelineError> {
        let fetcher = spawn_worker("fetcher", {
            let state = Arc::clone(&self.state);
            let config = self.config.clone();
            move || producer::run(&state, &config)
        })?;
        let progress = spawn_worker("progress", {
            let state = Arc::clone(&self.state);
            let config = self.config.clone();
            move || observer::run(&state, &config)
        })?;
        let processor = spawn_worker("processor", {
            let state = Arc::clone(&self.state);
            let config = self.config.clone();
            move || consumer::run(&state, &config)
        })?;

        join_worker("fetcher", fetcher)?;
        let observed_lengths = join_worker("progress", progress)?;
        let (content, version) = join_worker("processor", processor)?;

        Ok(RunReport {
            observed_lengths,
            content,
            version,
        })
    }
}

fn spawn_worker<Y, F>(role: &'static str, work: F) -> Result<thread::JoinHandle<Y>, PipelineError>
where
    F: FnOnce() -> Y + Send + 'static,
    Y: Send + 'static,
{
    thread::Builder::new()
        .name(role.to_string())
        .spawn(work)
        .map_err(|source| PipelineError::Spawn { role, source })
}

fn join_worker<Y>(
    role: &'static str,
    handle: thread::JoinHandle<Y>,
) -> Result<Y, PipelineError> {
    handle
        .join()
        .map_err(|_| PipelineError::WorkerPanicked { role })
}

/// optional random start delay, drawn fresh per worker
pub(crate) fn start_delay(config: &PipelineConfig) {
    if let Some(limit) = config.start_jitter {
        if !limit.is_zero() {
            thread::sleep(thread_rng().gen_range(Duration::ZERO..limit));
        }
    }
}

#[cfg(test)]
mod test {
    use std::thread::scope;

    use super::*;

    fn fast_config(chunk_count: u32) -> PipelineConfig {
        PipelineConfig {
            chunk_count,
            fetch_latency: Duration::from_millis(1),
            progress_timeout: Duration::from_millis(20),
            completion_poll: Duration::from_millis(1),
            consumer_delay: Duration::from_millis(1),
            start_jitter: None,
        }
    }

    #[test]
    fn test_processor_sees_every_block() {
        let report = Pipeline::new(fast_config(5)).run().unwrap();
        assert_eq!("Block1Block2Block3Block4Block5", report.content);
        assert_eq!(5, report.version);
    }

    #[test]
    fn test_observed_lengths_never_decrease() {
        let report = Pipeline::new(fast_config(5)).run().unwrap();
        assert!(!report.observed_lengths.is_empty());
        for pair in report.observed_lengths.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        // the reporter never sees more than the final payload
        for len in &report.observed_lengths {
            assert!(*len <= report.content.len());
        }
    }

    #[test]
    fn test_zero_blocks_still_terminates() {
        let report = Pipeline::new(fast_config(0)).run().unwrap();
        assert_eq!("", report.content);
        assert_eq!(0, report.version);
    }

    #[test]
    fn test_completion_is_never_missed_with_racing_starts() {
        // shake the start order across many runs; completion is leveled,
        // so every run has to terminate with the full content
        for _ in 0..1000 {
            let config = PipelineConfig {
                start_jitter: Some(Duration::from_millis(2)),
                ..fast_config(2)
            };
            let report = Pipeline::new(config).run().unwrap();
            assert_eq!("Block1Block2", report.content);
        }
    }

    #[test]
    fn test_late_readers_observe_completion_immediately() {
        let pipeline = Pipeline::new(fast_config(3));
        let state = pipeline.state();
        let report = pipeline.run().unwrap();

        // the run is long over; late readers must still not block
        scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    state.await_finished();
                    assert!(state.poll_finished(Duration::ZERO));
                    let (content, _) = state.payload();
                    assert_eq!(report.content, content);
                });
            }
        });
    }
}
