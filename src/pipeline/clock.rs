//! Tick-driven consumer that paces display and applies completed frames.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::diagnostics::stats::PipelineStats;

use super::buffers::FrameBuffers;
use super::sink::FrameSink;
use super::state::{PipelineState, UpdateState};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TickOutcome {
    /// The throttle interval has not elapsed yet.
    Throttled,
    /// `Idle → Ready`: a capture was requested.
    Requested,
    /// A capture is pending or in progress.
    Waiting,
    /// A completed frame was committed to the sink.
    Applied { frame: u64 },
    /// A failed cycle was acknowledged; the sink was not touched.
    Failed { frame: u64 },
    Paused,
    Terminated,
}

/// Consumer-side pacing state.
pub struct ConsumerClock {
    interval: Duration,
    timer: Duration,
    frame_counter: u64,
}

impl ConsumerClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timer: Duration::ZERO,
            frame_counter: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time accumulated since the last applied or failed cycle.
    pub fn timer(&self) -> Duration {
        self.timer
    }

    /// Completed cycles, successful or failed.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Advance by `dt` and act on the pipeline state.
    pub fn tick(
        &mut self,
        dt: Duration,
        state: &PipelineState,
        buffers: &Mutex<FrameBuffers>,
        sink: &mut dyn FrameSink,
        stats: &Mutex<PipelineStats>,
    ) -> TickOutcome {
        self.timer = self.timer.saturating_add(dt);
        if self.timer < self.interval {
            return TickOutcome::Throttled;
        }

        match state.load() {
            UpdateState::Idle => {
                if state.request_capture() {
                    TickOutcome::Requested
                } else {
                    TickOutcome::Waiting
                }
            }
            UpdateState::Ready | UpdateState::Capturing => TickOutcome::Waiting,
            UpdateState::Completed => {
                // The worker released the buffers before publishing Completed.
                let Some(buffers) = buffers.try_lock() else {
                    return TickOutcome::Waiting;
                };
                self.timer = Duration::ZERO;
                sink.commit(&buffers.surface);
                drop(buffers);
                self.frame_counter += 1;
                stats.lock().record_applied();
                state.transition(UpdateState::Completed, UpdateState::Idle);
                TickOutcome::Applied {
                    frame: self.frame_counter,
                }
            }
            UpdateState::Failed => {
                self.timer = Duration::ZERO;
                self.frame_counter += 1;
                stats.lock().record_failure();
                state.transition(UpdateState::Failed, UpdateState::Idle);
                TickOutcome::Failed {
                    frame: self.frame_counter,
                }
            }
            UpdateState::Paused => TickOutcome::Paused,
            UpdateState::Terminated => TickOutcome::Terminated,
        }
    }
}
