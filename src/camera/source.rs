//! Device capabilities the acquisition pipeline needs.
//!
//! The pipeline never talks to the SDK directly: it asks a [`FrameSource`]
//! for a frame and an [`ExposureProvider`] for how long to wait.

use crate::camera::error::Result;

/// Capture timeout used when the exposure cannot be read, in milliseconds.
pub const FALLBACK_CAPTURE_TIMEOUT_MS: i32 = 1000;

/// Blocking access to raw RGB24 frames.
pub trait FrameSource: Send + 'static {
    /// Fill `dest` with the next frame as contiguous 3-byte pixels, waiting
    /// up to `timeout_ms`. On failure `dest` is left unspecified.
    fn capture(&mut self, dest: &mut [u8], timeout_ms: i32) -> Result<()>;
}

impl FrameSource for Box<dyn FrameSource> {
    fn capture(&mut self, dest: &mut [u8], timeout_ms: i32) -> Result<()> {
        (**self).capture(dest, timeout_ms)
    }
}

/// Returns the capture timeout for the next attempt, in milliseconds.
///
/// Evaluated once per capture so exposure changes apply immediately.
pub type ExposureProvider = Box<dyn Fn() -> i32 + Send>;

/// Capture timeout for an exposure: `exposure_us * 2 + 500`, read as
/// milliseconds.
///
/// The exposure is not converted from microseconds first, so the timeout is
/// generous for long exposures.
pub fn capture_timeout_ms(exposure_us: i64) -> i32 {
    let timeout = exposure_us.saturating_mul(2).saturating_add(500);
    i32::try_from(timeout).unwrap_or(i32::MAX)
}

/// Exposure provider returning a fixed timeout.
pub fn fixed_timeout(timeout_ms: i32) -> ExposureProvider {
    Box::new(move || timeout_ms)
}
