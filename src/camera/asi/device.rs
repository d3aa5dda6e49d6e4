//! `AsiCamera<S>`: one opened ASI camera streaming RGB24 video.
//!
//! Generic over `S: AsiSdkApi` so tests use `MockAsiSdk` while production
//! uses the real `AsiSdk` wrapper.

use std::sync::Arc;

use crate::camera::error::{CameraError, Result};
use crate::camera::source::{
    capture_timeout_ms, ExposureProvider, FrameSource, FALLBACK_CAPTURE_TIMEOUT_MS,
};
use crate::camera::types::{CameraId, CameraInfo, Flip, Resolution};

use super::api::AsiSdkApi;
use super::controls::{CameraControls, ControlKind};
use super::types::ASI_IMG_RGB24;

/// An opened camera with video capture running.
///
/// The camera is released (capture stopped, camera closed) exactly once,
/// either by [`AsiCamera::close`] or on drop.
pub struct AsiCamera<S: AsiSdkApi> {
    sdk: Arc<S>,
    info: CameraInfo,
    width: u32,
    height: u32,
    released: bool,
}

impl<S: AsiSdkApi> AsiCamera<S> {
    /// Open the camera at `index` and start RGB24 video capture at
    /// `resolution`, centred on the sensor.
    ///
    /// # Errors
    ///
    /// `DeviceNotFound` when no camera is connected at `index`,
    /// `InvalidConfig` when the resolution exceeds the sensor, or the SDK
    /// error of whichever step failed. The camera is closed again if any
    /// step after opening fails.
    pub fn open(sdk: Arc<S>, index: usize, resolution: Resolution) -> Result<Self> {
        let count = sdk.num_connected_cameras();
        if count == 0 {
            return Err(CameraError::DeviceNotFound(
                "no ASI camera connected".to_string(),
            ));
        }
        if index >= count {
            return Err(CameraError::DeviceNotFound(format!(
                "camera index {index} out of range ({count} connected)"
            )));
        }

        let info = CameraInfo::from(&sdk.camera_property(index)?);
        let (width, height) = resolution.resolve(info.max_width, info.max_height);

        sdk.open_camera(info.id)?;
        if let Err(e) = start_video(&*sdk, &info, width, height) {
            if let Err(close_err) = sdk.close_camera(info.id) {
                tracing::warn!("Failed to close {} after open error: {close_err}", info.id);
            }
            return Err(e);
        }

        tracing::info!(
            "Opened {} ({}) at {width}x{height}",
            info.name,
            info.id
        );

        Ok(Self {
            sdk,
            info,
            width,
            height,
            released: false,
        })
    }

    pub fn info(&self) -> &CameraInfo {
        &self.info
    }

    pub fn id(&self) -> CameraId {
        self.info.id
    }

    /// Capture size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Control passthrough for this camera.
    pub fn controls(&self) -> CameraControls<S> {
        CameraControls::new(Arc::clone(&self.sdk), self.info.id)
    }

    /// Apply the image flip (manual mode).
    pub fn set_flip(&self, flip: Flip) -> Result<()> {
        self.controls()
            .set(ControlKind::Flip, flip.control_value(), false)
    }

    /// Set the exposure in microseconds.
    pub fn set_exposure(&self, exposure_us: i64, auto: bool) -> Result<()> {
        self.controls().set(ControlKind::Exposure, exposure_us, auto)
    }

    /// Stop capture and close the camera. Later calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let id = self.info.id;
        if let Err(e) = self.sdk.stop_video_capture(id) {
            tracing::warn!("Failed to stop video capture on {id}: {e}");
        }
        self.sdk.close_camera(id)?;
        tracing::info!("Closed {} ({id})", self.info.name);
        Ok(())
    }
}

impl<S: AsiSdkApi + 'static> AsiCamera<S> {
    /// Capture-timeout provider that reads the live exposure each call.
    pub fn exposure_provider(&self) -> ExposureProvider {
        let sdk = Arc::clone(&self.sdk);
        let id = self.info.id;
        Box::new(move || match sdk.control_value(id, ControlKind::Exposure) {
            Ok((exposure_us, _)) => capture_timeout_ms(exposure_us),
            Err(e) => {
                tracing::debug!("Exposure read failed on {id}, using fallback timeout: {e}");
                FALLBACK_CAPTURE_TIMEOUT_MS
            }
        })
    }
}

/// Initialise the camera and start RGB24 video capture with a centred ROI.
fn start_video<S: AsiSdkApi + ?Sized>(
    sdk: &S,
    info: &CameraInfo,
    width: u32,
    height: u32,
) -> Result<()> {
    let id = info.id;
    sdk.init_camera(id)?;

    if width > info.max_width || height > info.max_height {
        return Err(CameraError::InvalidConfig(format!(
            "{width}x{height} exceeds the {}x{} sensor of {}",
            info.max_width, info.max_height, info.name
        )));
    }

    sdk.set_roi_format(id, width, height, 1, ASI_IMG_RGB24)?;
    sdk.set_start_pos(
        id,
        (info.max_width - width) / 2,
        (info.max_height - height) / 2,
    )?;
    sdk.start_video_capture(id)
}

impl<S: AsiSdkApi + 'static> FrameSource for AsiCamera<S> {
    fn capture(&mut self, dest: &mut [u8], timeout_ms: i32) -> Result<()> {
        let expected = self.width as usize * self.height as usize * 3;
        if dest.len() != expected {
            return Err(CameraError::InvalidConfig(format!(
                "capture buffer is {} bytes, expected {expected}",
                dest.len()
            )));
        }
        self.sdk.video_data(self.info.id, dest, timeout_ms)
    }
}

impl<S: AsiSdkApi> Drop for AsiCamera<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close {}: {e}", self.info.id);
        }
    }
}
