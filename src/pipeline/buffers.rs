//! Frame buffers shared by the worker and the consumer.
//!
//! Both buffers are allocated once per session and never resized. The
//! device writes RGB24 straight into [`RawFrameBuffer`]; the worker converts
//! it into the RGBA [`PixelSurface`] the display reads.

use bytemuck::{Pod, Zeroable};

use crate::camera::error::{CameraError, Result};

/// One display pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    /// Convert a device triplet. The camera delivers red and blue swapped,
    /// so the first byte is blue.
    #[inline]
    pub fn from_device_triplet(c0: u8, c1: u8, c2: u8) -> Self {
        Self {
            r: c2,
            g: c1,
            b: c0,
            a: u8::MAX,
        }
    }
}

/// Allocate a zeroed boxed slice without aborting on allocation failure.
fn try_alloc<T: Copy + Default>(len: usize, what: &str) -> Result<Box<[T]>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        CameraError::Resource(format!("failed to allocate {what} of {len} elements: {e}"))
    })?;
    data.resize(len, T::default());
    Ok(data.into_boxed_slice())
}

fn pixel_count(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(CameraError::InvalidConfig(format!(
            "frame size {width}x{height} is empty"
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| CameraError::Resource(format!("frame size {width}x{height} overflows")))
}

/// Raw device frame: `width * height` contiguous 3-byte pixels.
pub struct RawFrameBuffer {
    data: Box<[u8]>,
    width: u32,
    height: u32,
}

impl RawFrameBuffer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = pixel_count(width, height)?.checked_mul(3).ok_or_else(|| {
            CameraError::Resource(format!("frame size {width}x{height} overflows"))
        })?;
        Ok(Self {
            data: try_alloc(len, "raw frame buffer")?,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Destination handed to the device.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Display-ready RGBA pixels.
pub struct PixelSurface {
    pixels: Box<[Rgba8]>,
    width: u32,
    height: u32,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = pixel_count(width, height)?;
        Ok(Self {
            pixels: try_alloc(len, "pixel surface")?,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba8] {
        &self.pixels
    }

    /// The surface as tightly packed RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Convert `raw` into this surface one row at a time.
    ///
    /// `cancelled` is polled before each row; returns `false` if conversion
    /// was abandoned. Rows already converted stay converted.
    pub fn convert_from(&mut self, raw: &RawFrameBuffer, cancelled: impl Fn() -> bool) -> bool {
        debug_assert_eq!(raw.len(), self.pixels.len() * 3);
        let row_pixels = self.width as usize;

        let rows = self
            .pixels
            .chunks_exact_mut(row_pixels)
            .zip(raw.as_slice().chunks_exact(row_pixels * 3));
        for (dst_row, src_row) in rows {
            if cancelled() {
                return false;
            }
            for (dst, src) in dst_row.iter_mut().zip(src_row.chunks_exact(3)) {
                *dst = Rgba8::from_device_triplet(src[0], src[1], src[2]);
            }
        }
        true
    }
}

/// The buffer pair the worker fills and the consumer reads.
pub struct FrameBuffers {
    pub raw: RawFrameBuffer,
    pub surface: PixelSurface,
}

impl FrameBuffers {
    /// Allocate both buffers.
    ///
    /// # Errors
    ///
    /// `Resource` if either allocation fails, `InvalidConfig` for an empty
    /// size.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            raw: RawFrameBuffer::new(width, height)?,
            surface: PixelSurface::new(width, height)?,
        })
    }

    /// Convert the raw frame into the surface.
    pub fn convert(&mut self, cancelled: impl Fn() -> bool) -> bool {
        self.surface.convert_from(&self.raw, cancelled)
    }

    /// Free both allocations. Used once the worker has stopped.
    pub fn release(&mut self) {
        self.raw.data = Box::default();
        self.surface.pixels = Box::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn swaps_red_and_blue_and_forces_opaque() {
        assert_eq!(
            Rgba8::from_device_triplet(10, 20, 30),
            Rgba8 {
                r: 30,
                g: 20,
                b: 10,
                a: 255
            }
        );
    }

    #[test]
    fn hd720_buffer_sizes() {
        let buffers = FrameBuffers::new(1280, 720).unwrap();
        assert_eq!(buffers.raw.len(), 2_764_800);
        assert_eq!(buffers.surface.pixels().len(), 921_600);
        assert_eq!(buffers.surface.as_bytes().len(), 921_600 * 4);
    }

    #[test]
    fn conversion_reuses_the_same_allocations() {
        let mut buffers = FrameBuffers::new(64, 8).unwrap();
        let raw_ptr = buffers.raw.as_slice().as_ptr();
        let surface_ptr = buffers.surface.pixels().as_ptr();

        for fill in [1u8, 2, 3] {
            buffers.raw.as_mut_slice().fill(fill);
            assert!(buffers.convert(|| false));
        }

        assert_eq!(buffers.raw.as_slice().as_ptr(), raw_ptr);
        assert_eq!(buffers.surface.pixels().as_ptr(), surface_ptr);
        assert_eq!(buffers.surface.pixels()[0], Rgba8::from_device_triplet(3, 3, 3));
    }

    #[test]
    fn converts_every_pixel() {
        let mut buffers = FrameBuffers::new(3, 2).unwrap();
        for (i, chunk) in buffers.raw.as_mut_slice().chunks_exact_mut(3).enumerate() {
            let i = i as u8;
            chunk.copy_from_slice(&[i, i + 10, i + 20]);
        }
        assert!(buffers.convert(|| false));
        let last = buffers.surface.pixels()[5];
        assert_eq!(last, Rgba8 { r: 25, g: 15, b: 5, a: 255 });
        assert_eq!(&buffers.surface.as_bytes()[..4], &[20, 10, 0, 255]);
    }

    #[test]
    fn cancellation_is_checked_per_row() {
        let mut buffers = FrameBuffers::new(4, 5).unwrap();
        buffers.raw.as_mut_slice().fill(7);
        let polls = Cell::new(0);

        let finished = buffers.convert(|| {
            polls.set(polls.get() + 1);
            polls.get() > 2
        });

        assert!(!finished);
        assert_eq!(polls.get(), 3);
        let pixels = buffers.surface.pixels();
        assert_eq!(pixels[7], Rgba8::from_device_triplet(7, 7, 7));
        assert_eq!(pixels[8], Rgba8::default());
    }

    #[test]
    fn release_frees_both_buffers() {
        let mut buffers = FrameBuffers::new(16, 16).unwrap();
        buffers.release();
        assert!(buffers.raw.is_empty());
        assert!(buffers.surface.pixels().is_empty());
        assert!(buffers.convert(|| false));
    }

    #[test]
    fn empty_size_is_invalid_config() {
        assert!(matches!(
            FrameBuffers::new(0, 720),
            Err(CameraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn impossible_allocation_is_a_resource_error() {
        // Fits in usize but exceeds isize::MAX bytes.
        assert!(matches!(
            RawFrameBuffer::new(u32::MAX, 1 << 30),
            Err(CameraError::Resource(_))
        ));
        assert!(matches!(
            FrameBuffers::new(u32::MAX, u32::MAX),
            Err(CameraError::Resource(_))
        ));
    }
}
