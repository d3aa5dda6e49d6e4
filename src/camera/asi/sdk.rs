//! Safe ASICamera2 wrapper.
//!
//! Only compiled when the `asi` feature is enabled and the vendor library is
//! available. Production code uses this; tests use `MockAsiSdk` instead.

use std::os::raw::{c_int, c_long};

use crate::camera::error::{CameraError, Result};
use crate::camera::types::CameraId;

use super::api::AsiSdkApi;
use super::controls::ControlKind;
use super::ffi;
use super::types::{
    i64_to_long, long_to_i64, AsiBool, AsiCameraInfoRaw, AsiControlCapsRaw, AsiError,
    AsiErrorCode, AsiImgType, ASI_FALSE, ASI_TRUE,
};

/// Safe wrapper around the ASICamera2 library.
///
/// The library keeps its own per-camera locking, so a single instance can be
/// shared between the acquisition thread and control callers.
pub struct AsiSdk {
    _private: (),
}

impl AsiSdk {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for AsiSdk {
    fn default() -> Self {
        Self::new()
    }
}

fn check(call: &'static str, code: AsiErrorCode) -> Result<()> {
    AsiError::check(code).map_err(|e| CameraError::sdk(call, e))
}

fn to_c_int(call: &'static str, value: impl TryInto<c_int>) -> Result<c_int> {
    value
        .try_into()
        .map_err(|_| CameraError::sdk(call, AsiError::OutOfBoundary))
}

fn to_asi_bool(value: bool) -> AsiBool {
    if value {
        ASI_TRUE
    } else {
        ASI_FALSE
    }
}

impl AsiSdkApi for AsiSdk {
    fn num_connected_cameras(&self) -> usize {
        let count = unsafe { ffi::ASIGetNumOfConnectedCameras() };
        usize::try_from(count).unwrap_or(0)
    }

    fn camera_property(&self, index: usize) -> Result<AsiCameraInfoRaw> {
        let call = "ASIGetCameraProperty";
        let index = to_c_int(call, index)?;
        let mut info = AsiCameraInfoRaw::zeroed();
        check(call, unsafe { ffi::ASIGetCameraProperty(&mut info, index) })?;
        Ok(info)
    }

    fn open_camera(&self, camera: CameraId) -> Result<()> {
        check("ASIOpenCamera", unsafe { ffi::ASIOpenCamera(camera.0) })
    }

    fn init_camera(&self, camera: CameraId) -> Result<()> {
        check("ASIInitCamera", unsafe { ffi::ASIInitCamera(camera.0) })
    }

    fn close_camera(&self, camera: CameraId) -> Result<()> {
        check("ASICloseCamera", unsafe { ffi::ASICloseCamera(camera.0) })
    }

    fn num_controls(&self, camera: CameraId) -> Result<usize> {
        let mut count: c_int = 0;
        check("ASIGetNumOfControls", unsafe {
            ffi::ASIGetNumOfControls(camera.0, &mut count)
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn control_caps(&self, camera: CameraId, index: usize) -> Result<AsiControlCapsRaw> {
        let call = "ASIGetControlCaps";
        let index = to_c_int(call, index)?;
        let mut caps = AsiControlCapsRaw::zeroed();
        check(call, unsafe {
            ffi::ASIGetControlCaps(camera.0, index, &mut caps)
        })?;
        Ok(caps)
    }

    fn control_value(&self, camera: CameraId, control: ControlKind) -> Result<(i64, bool)> {
        let mut value: c_long = 0;
        let mut auto: AsiBool = ASI_FALSE;
        check("ASIGetControlValue", unsafe {
            ffi::ASIGetControlValue(camera.0, control.asi_code(), &mut value, &mut auto)
        })?;
        Ok((long_to_i64(value), auto == ASI_TRUE))
    }

    fn set_control_value(
        &self,
        camera: CameraId,
        control: ControlKind,
        value: i64,
        auto: bool,
    ) -> Result<()> {
        let call = "ASISetControlValue";
        let value =
            i64_to_long(value).ok_or(CameraError::sdk(call, AsiError::OutOfBoundary))?;
        check(call, unsafe {
            ffi::ASISetControlValue(camera.0, control.asi_code(), value, to_asi_bool(auto))
        })
    }

    fn set_roi_format(
        &self,
        camera: CameraId,
        width: u32,
        height: u32,
        bin: u32,
        img_type: AsiImgType,
    ) -> Result<()> {
        let call = "ASISetROIFormat";
        let (width, height, bin) = (
            to_c_int(call, width)?,
            to_c_int(call, height)?,
            to_c_int(call, bin)?,
        );
        check(call, unsafe {
            ffi::ASISetROIFormat(camera.0, width, height, bin, img_type)
        })
    }

    fn set_start_pos(&self, camera: CameraId, x: u32, y: u32) -> Result<()> {
        let call = "ASISetStartPos";
        let (x, y) = (to_c_int(call, x)?, to_c_int(call, y)?);
        check(call, unsafe { ffi::ASISetStartPos(camera.0, x, y) })
    }

    fn start_video_capture(&self, camera: CameraId) -> Result<()> {
        check("ASIStartVideoCapture", unsafe {
            ffi::ASIStartVideoCapture(camera.0)
        })
    }

    fn stop_video_capture(&self, camera: CameraId) -> Result<()> {
        check("ASIStopVideoCapture", unsafe {
            ffi::ASIStopVideoCapture(camera.0)
        })
    }

    fn video_data(&self, camera: CameraId, buffer: &mut [u8], wait_ms: i32) -> Result<()> {
        let size = c_long::try_from(buffer.len())
            .map_err(|_| CameraError::Capture(AsiError::BufferTooSmall))?;
        // The SDK writes at most `size` bytes into `buffer`.
        let code =
            unsafe { ffi::ASIGetVideoData(camera.0, buffer.as_mut_ptr(), size, wait_ms) };
        AsiError::check(code).map_err(CameraError::Capture)
    }
}
