//! # Download coordination
//!
//! One coordination object for the whole pipeline: the shared buffer behind
//! its mutex with a "new data" condvar, and the completion flag behind its
//! own mutex with a "download done" condvar. The two locks are never taken
//! nested, so there is no ordering hazard.
//!
//! The protocol leans on two rules:
//! - The boolean predicate, not the notify event, is ground truth. Every
//!   wait re-checks its flag under the lock ([Condvar::wait_while] /
//!   [Condvar::wait_timeout_while] do exactly that), which defeats both
//!   lost wakeups (notify fired before the wait began) and spurious wakeups
//!   (wait returned without a notify).
//! - `finished` is leveled: set once, never reset. A waiter that shows up
//!   arbitrarily late still sees it immediately, so completion cannot be
//!   missed no matter how the threads interleave.
//!
//! Locks are held only across the read/modify/flag-set, never across a
//! notify or a sleep.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use log::trace;

use crate::buffer::DownloadBuffer;

/// The payload and the progress flag live under one lock: the flag must
/// flip in the same critical section as the append it announces.
#[derive(Default)]
struct BufferState {
    buffer: DownloadBuffer,
    updated: bool,
}

pub struct DownloadState {
    data: Mutex<BufferState>,
    data_ready: Condvar,
    finished: Mutex<bool>,
    download_done: Condvar,
}

impl Default for DownloadState {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadState {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(BufferState::default()),
            data_ready: Condvar::new(),
            finished: Mutex::new(false),
            download_done: Condvar::new(),
        }
    }

    /// Producer side: append one chunk, raise the progress flag, then
    /// broadcast to every reader waiting on new data. Returns the buffer
    /// version after the append.
    ///
    /// This is the seam where a real fetch would become fallible: return
    /// the error instead of notifying and retry the same iteration.
    pub fn append_chunk(&self, chunk: &str) -> u64 {
        let version = {
            let mut data = self.data.lock().unwrap();
            data.buffer.append(chunk);
            data.updated = true;
            data.buffer.version()
        };
        // notify outside the critical section
        self.data_ready.notify_all();
        trace!("appended chunk, buffer at version {version}");
        version
    }

    /// Producer side, called exactly once after the last append: raise the
    /// completion flag and wake everyone waiting for the end. The flag is
    /// monotonic - there is no way to clear it again.
    pub fn mark_finished(&self) {
        {
            let mut finished = self.finished.lock().unwrap();
            *finished = true;
        }
        self.download_done.notify_all();
        trace!("download marked finished");
    }

    /// Observer side: wait until new data was appended, but no longer than
    /// `timeout` (the producer may already be past its last notify). Reads
    /// the current length and lowers the progress flag while still holding
    /// the lock, so no append can slip between the read and the reset.
    pub fn await_progress(&self, timeout: Duration) -> usize {
        let guard = self.data.lock().unwrap();
        let (mut data, _) = self
            .data_ready
            .wait_timeout_while(guard, timeout, |state| !state.updated)
            .unwrap();
        let len = data.buffer.len();
        data.updated = false;
        len
    }

    /// Short bounded check of the completion flag. Returns the flag's value
    /// as seen under the lock, whether the wait was notified or timed out.
    pub fn poll_finished(&self, timeout: Duration) -> bool {
        let guard = self.finished.lock().unwrap();
        let (finished, _) = self
            .download_done
            .wait_timeout_while(guard, timeout, |finished| !*finished)
            .unwrap();
        *finished
    }

    /// Consumer side: block until the download has finished. Returns
    /// immediately if it already has.
    pub fn await_finished(&self) {
        let guard = self.finished.lock().unwrap();
        let _finished = self
            .download_done
            .wait_while(guard, |finished| !*finished)
            .unwrap();
    }

    /// Final content and version. Meant to be read after [Self::await_finished]:
    /// `finished` is monotonic and set only after the last append, so the
    /// snapshot taken here is the complete download, never a partial one.
    pub fn payload(&self) -> (String, u64) {
        let data = self.data.lock().unwrap();
        (data.buffer.content().to_string(), data.buffer.version())
    }

    /// Current length; readers must come through the lock even for this.
    pub fn len(&self) -> usize {
        self.data.lock().unwrap().buffer.len()
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.lock().unwrap()
    }
}
