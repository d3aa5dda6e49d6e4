//! Raw ASICamera2 FFI declarations.
//!
//! Only compiled when the `asi` feature is enabled and the vendor library is
//! available for linking. All access goes through the safe `AsiSdk` wrapper.

#![allow(non_snake_case)]

use std::os::raw::{c_int, c_long, c_uchar};

use super::types::{
    AsiBool, AsiCameraInfoRaw, AsiControlCapsRaw, AsiControlType, AsiErrorCode, AsiImgType,
};

#[link(name = "ASICamera2")]
extern "C" {
    /// Number of connected ASI cameras. Call before any other function.
    pub fn ASIGetNumOfConnectedCameras() -> c_int;

    /// Properties of the camera at `index` (0-based, not the camera ID).
    pub fn ASIGetCameraProperty(info: *mut AsiCameraInfoRaw, index: c_int) -> AsiErrorCode;

    pub fn ASIOpenCamera(camera_id: c_int) -> AsiErrorCode;

    /// Initialise an opened camera. Must follow `ASIOpenCamera`.
    pub fn ASIInitCamera(camera_id: c_int) -> AsiErrorCode;

    pub fn ASICloseCamera(camera_id: c_int) -> AsiErrorCode;

    pub fn ASIGetNumOfControls(camera_id: c_int, count: *mut c_int) -> AsiErrorCode;

    pub fn ASIGetControlCaps(
        camera_id: c_int,
        index: c_int,
        caps: *mut AsiControlCapsRaw,
    ) -> AsiErrorCode;

    pub fn ASIGetControlValue(
        camera_id: c_int,
        control_type: AsiControlType,
        value: *mut c_long,
        auto: *mut AsiBool,
    ) -> AsiErrorCode;

    pub fn ASISetControlValue(
        camera_id: c_int,
        control_type: AsiControlType,
        value: c_long,
        auto: AsiBool,
    ) -> AsiErrorCode;

    /// Set ROI size, binning, and image type. Stop capture before calling.
    pub fn ASISetROIFormat(
        camera_id: c_int,
        width: c_int,
        height: c_int,
        bin: c_int,
        img_type: AsiImgType,
    ) -> AsiErrorCode;

    /// Set the ROI origin, in binned pixels.
    pub fn ASISetStartPos(camera_id: c_int, start_x: c_int, start_y: c_int) -> AsiErrorCode;

    pub fn ASIStartVideoCapture(camera_id: c_int) -> AsiErrorCode;

    pub fn ASIStopVideoCapture(camera_id: c_int) -> AsiErrorCode;

    /// Copy the next video frame into `buffer`, waiting up to `wait_ms`
    /// (-1 waits forever).
    pub fn ASIGetVideoData(
        camera_id: c_int,
        buffer: *mut c_uchar,
        buffer_size: c_long,
        wait_ms: c_int,
    ) -> AsiErrorCode;
}
