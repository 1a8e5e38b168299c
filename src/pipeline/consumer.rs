//! The processor: waits out the whole download, then reads it once.

use std::thread;

use log::info;

use super::{start_delay, PipelineConfig};
use crate::coordination::DownloadState;

/// Blocks until the download has finished, then takes the final payload.
/// The completion lock is released before the data lock is taken; that is
/// safe because `finished` is monotonic and set only after the writer's
/// last append, so the payload read here is always the complete one.
pub(crate) fn run(state: &DownloadState, config: &PipelineConfig) -> (String, u64) {
    start_delay(config);
    // not ready right away
    thread::sleep(config.consumer_delay);
    state.await_finished();
    let (content, version) = state.payload();
    info!("processing {} bytes at version {version}", content.len());
    (content, version)
}
