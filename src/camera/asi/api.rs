//! `AsiSdkApi` trait — abstracts ASICamera2 operations for testability.
//!
//! The real `AsiSdk` and the `MockAsiSdk` both implement this trait,
//! allowing `AsiCamera<S>` to be generic over the SDK implementation.

use crate::camera::error::Result;
use crate::camera::types::CameraId;

use super::controls::ControlKind;
use super::types::{AsiCameraInfoRaw, AsiControlCapsRaw, AsiImgType};

/// Abstraction over the ASICamera2 SDK.
///
/// All methods take `&self` — the implementation manages interior
/// mutability. `video_data` blocks for up to `wait_ms` and is called from
/// the acquisition thread while control calls may arrive from elsewhere.
pub trait AsiSdkApi: Send + Sync {
    /// Number of cameras currently connected.
    fn num_connected_cameras(&self) -> usize;

    /// Camera properties for the camera at `index` (not the camera ID).
    fn camera_property(&self, index: usize) -> Result<AsiCameraInfoRaw>;

    /// Open a camera. Must precede any other call with this ID.
    fn open_camera(&self, camera: CameraId) -> Result<()>;

    /// Initialise an opened camera.
    fn init_camera(&self, camera: CameraId) -> Result<()>;

    /// Close a camera and release its SDK resources.
    fn close_camera(&self, camera: CameraId) -> Result<()>;

    /// Number of controls the camera exposes.
    fn num_controls(&self, camera: CameraId) -> Result<usize>;

    /// Capabilities of the control at `index`.
    fn control_caps(&self, camera: CameraId, index: usize) -> Result<AsiControlCapsRaw>;

    /// Read a control value and its auto flag.
    fn control_value(&self, camera: CameraId, control: ControlKind) -> Result<(i64, bool)>;

    /// Write a control value and its auto flag.
    fn set_control_value(
        &self,
        camera: CameraId,
        control: ControlKind,
        value: i64,
        auto: bool,
    ) -> Result<()>;

    /// Set the region of interest size, binning, and pixel format.
    fn set_roi_format(
        &self,
        camera: CameraId,
        width: u32,
        height: u32,
        bin: u32,
        img_type: AsiImgType,
    ) -> Result<()>;

    /// Set the top-left corner of the region of interest.
    fn set_start_pos(&self, camera: CameraId, x: u32, y: u32) -> Result<()>;

    /// Start continuous video capture.
    fn start_video_capture(&self, camera: CameraId) -> Result<()>;

    /// Stop continuous video capture.
    fn stop_video_capture(&self, camera: CameraId) -> Result<()>;

    /// Fill `buffer` with the next video frame, waiting up to `wait_ms`.
    ///
    /// Failures map to `CameraError::Capture`.
    fn video_data(&self, camera: CameraId, buffer: &mut [u8], wait_ms: i32) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the trait is object-safe (can be used as `dyn AsiSdkApi`).
    #[test]
    fn trait_is_object_safe() {
        fn _accepts_dyn(_sdk: &dyn AsiSdkApi) {}
    }

    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Box<dyn AsiSdkApi>>();
    }
}
