//! Display side of the pipeline.

use super::buffers::PixelSurface;

/// Receives each completed frame.
///
/// Called on the consumer's thread, only after the worker has handed the
/// surface over. Implementations copy what they need; the surface is reused
/// for the next capture.
pub trait FrameSink {
    fn commit(&mut self, surface: &PixelSurface);
}

/// Owned RGBA copy of the most recently committed frame.
#[derive(Debug, Clone, Default)]
pub struct OutputImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    commits: u64,
}

impl OutputImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tightly packed RGBA bytes; empty until the first commit.
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Number of frames committed so far.
    pub fn commits(&self) -> u64 {
        self.commits
    }
}

impl FrameSink for OutputImage {
    fn commit(&mut self, surface: &PixelSurface) {
        self.width = surface.width();
        self.height = surface.height();
        self.rgba.clear();
        self.rgba.extend_from_slice(surface.as_bytes());
        self.commits += 1;
    }
}
