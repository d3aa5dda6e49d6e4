//! Frame acquisition worker thread.
//!
//! Waits for `Ready`, claims the capture, lets the device fill the raw
//! buffer, converts it, and publishes `Completed` or `Failed`. Runs until
//! the state becomes `Terminated`, then hands the source back for release.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::Mutex;

use crate::camera::error::{CameraError, Result};
use crate::camera::source::{ExposureProvider, FrameSource};
use crate::diagnostics::stats::PipelineStats;

use super::buffers::FrameBuffers;
use super::state::{PipelineState, UpdateState};

/// State shared by the worker and the consumer.
pub(crate) struct Shared {
    pub(crate) state: PipelineState,
    pub(crate) buffers: Mutex<FrameBuffers>,
    pub(crate) stats: Mutex<PipelineStats>,
}

/// Spawn the worker thread.
pub(crate) fn spawn<F: FrameSource>(
    name: String,
    source: F,
    exposure: ExposureProvider,
    shared: Arc<Shared>,
) -> Result<JoinHandle<F>> {
    std::thread::Builder::new()
        .name(name)
        .spawn(move || run(source, &exposure, &shared))
        .map_err(|e| CameraError::Resource(format!("failed to spawn acquisition thread: {e}")))
}

fn run<F: FrameSource>(mut source: F, exposure: &ExposureProvider, shared: &Shared) -> F {
    let state = &shared.state;

    loop {
        if state.wait_for_ready() == UpdateState::Terminated {
            break;
        }
        // Lost to a concurrent pause; wait again.
        if !state.transition(UpdateState::Ready, UpdateState::Capturing) {
            continue;
        }

        let timeout_ms = exposure();
        let started = Instant::now();
        let mut buffers = shared.buffers.lock();

        let next = match source.capture(buffers.raw.as_mut_slice(), timeout_ms) {
            Ok(()) => {
                if !buffers.convert(|| state.load() == UpdateState::Terminated) {
                    break;
                }
                let bytes = buffers.raw.len();
                shared.stats.lock().record_capture(bytes, started.elapsed());
                UpdateState::Completed
            }
            Err(e) => {
                tracing::debug!("Capture failed (timeout {timeout_ms} ms): {e}");
                UpdateState::Failed
            }
        };
        drop(buffers);

        if !state.transition(UpdateState::Capturing, next) {
            match state.load() {
                UpdateState::Terminated => break,
                other => {
                    tracing::debug!("Discarding {next:?} capture finished while {other:?}");
                    shared.stats.lock().record_stranded();
                }
            }
        }
    }

    tracing::debug!("Acquisition worker exiting");
    source
}
