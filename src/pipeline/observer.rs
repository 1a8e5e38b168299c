//! The progress reporter: read-only, driven by both signals.

use log::{debug, info};

use super::{start_delay, PipelineConfig};
use crate::coordination::DownloadState;

/// Report loop: wait (bounded) for fresh data, report the current length,
/// then briefly check for completion. The completion check is a short
/// timed wait rather than a blocking one, so the reporter stays responsive
/// to further progress without busy-spinning. A missed intermediate notify
/// is fine - the next iteration reads the length again, not a queue of
/// deltas.
pub(crate) fn run(state: &DownloadState, config: &PipelineConfig) -> Vec<usize> {
    start_delay(config);
    let mut observed = Vec::new();
    loop {
        let len = state.await_progress(config.progress_timeout);
        debug!("received {len} bytes so far");
        observed.push(len);

        if state.poll_finished(config.completion_poll) {
            info!("download complete, progress reporting done");
            break;
        }
    }
    observed
}
