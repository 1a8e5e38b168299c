//! The fetcher: sole writer of the shared buffer.

use std::thread;

use log::{debug, info};

use super::{start_delay, PipelineConfig};
use crate::coordination::DownloadState;

/// Bounded fetch loop. Each iteration sleeps out the simulated network
/// latency (outside any lock), appends one labeled chunk and broadcasts
/// the progress signal. The completion signal fires exactly once, after
/// the last append.
pub(crate) fn run(state: &DownloadState, config: &PipelineConfig) {
    start_delay(config);
    for i in 1..=config.chunk_count {
        thread::sleep(config.fetch_latency);
        let version = state.append_chunk(&format!("Block{i}"));
        debug!("fetched block {i}, buffer at version {version}");
    }
    state.mark_finished();
    info!("download finished after {} blocks", config.chunk_count);
}
