//! Shared update state between the acquisition worker and the consumer.
//!
//! The state is a single `AtomicU8` moved with compare-and-swap. The worker
//! sleeps on a condition variable while the state is not `Ready`; every
//! transition into `Ready` or `Terminated` wakes it.

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum UpdateState {
    /// Waiting for the consumer to request a frame.
    Idle = 0,
    /// A capture was requested and the worker may claim it.
    Ready = 1,
    /// The worker owns the buffers.
    Capturing = 2,
    /// A converted frame is waiting for the consumer.
    Completed = 3,
    /// The last capture failed; the surface holds the previous frame.
    Failed = 4,
    Paused = 5,
    /// Absorbing.
    Terminated = 6,
}

impl UpdateState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Ready,
            2 => Self::Capturing,
            3 => Self::Completed,
            4 => Self::Failed,
            5 => Self::Paused,
            _ => Self::Terminated,
        }
    }

    /// States that the worker must be woken for.
    fn wakes_worker(self) -> bool {
        matches!(self, Self::Ready | Self::Terminated)
    }
}

/// Atomic state machine plus the worker's wait primitive.
pub struct PipelineState {
    state: AtomicU8,
    wait_lock: Mutex<()>,
    wake: Condvar,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(UpdateState::Idle as u8),
            wait_lock: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    pub fn load(&self) -> UpdateState {
        UpdateState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move `from → to` if the state is still `from`.
    pub fn transition(&self, from: UpdateState, to: UpdateState) -> bool {
        let moved = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved && to.wakes_worker() {
            self.notify_worker();
        }
        moved
    }

    /// `Idle → Ready`.
    pub fn request_capture(&self) -> bool {
        self.transition(UpdateState::Idle, UpdateState::Ready)
    }

    /// Set `Paused` from any state but `Terminated`.
    ///
    /// An in-flight capture keeps running; its result is discarded.
    pub fn pause(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current == UpdateState::Terminated as u8 {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                UpdateState::Paused as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// `Paused → Ready`. No-op in any other state.
    pub fn resume(&self) -> bool {
        self.transition(UpdateState::Paused, UpdateState::Ready)
    }

    /// Set `Terminated`. Returns `false` if it already was.
    pub fn terminate(&self) -> bool {
        let previous = self
            .state
            .swap(UpdateState::Terminated as u8, Ordering::AcqRel);
        self.notify_worker();
        previous != UpdateState::Terminated as u8
    }

    /// Block until the state is `Ready` or `Terminated` and return it.
    pub fn wait_for_ready(&self) -> UpdateState {
        let mut guard = self.wait_lock.lock();
        loop {
            let state = self.load();
            if state.wakes_worker() {
                return state;
            }
            self.wake.wait(&mut guard);
        }
    }

    // The store happened before this; taking the lock orders it against a
    // worker that checked the state but has not started waiting yet.
    fn notify_worker(&self) {
        let _guard = self.wait_lock.lock();
        self.wake.notify_all();
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
