//! ASI SDK C type definitions, error codes, and control/image type constants.
//!
//! Values sourced from the ZWO `ASICamera2.h` header.

use std::fmt;
use std::os::raw::{c_char, c_double, c_float, c_int, c_long};

/// Vendor return code type (`ASI_ERROR_CODE`).
pub type AsiErrorCode = c_int;

/// Vendor boolean (`ASI_BOOL`).
pub type AsiBool = c_int;

pub const ASI_FALSE: AsiBool = 0;
pub const ASI_TRUE: AsiBool = 1;

// --- Error codes ---

pub const ASI_SUCCESS: AsiErrorCode = 0;
pub const ASI_ERROR_INVALID_INDEX: AsiErrorCode = 1;
pub const ASI_ERROR_INVALID_ID: AsiErrorCode = 2;
pub const ASI_ERROR_INVALID_CONTROL_TYPE: AsiErrorCode = 3;
pub const ASI_ERROR_CAMERA_CLOSED: AsiErrorCode = 4;
pub const ASI_ERROR_CAMERA_REMOVED: AsiErrorCode = 5;
pub const ASI_ERROR_INVALID_PATH: AsiErrorCode = 6;
pub const ASI_ERROR_INVALID_FILEFORMAT: AsiErrorCode = 7;
pub const ASI_ERROR_INVALID_SIZE: AsiErrorCode = 8;
pub const ASI_ERROR_INVALID_IMGTYPE: AsiErrorCode = 9;
pub const ASI_ERROR_OUTOF_BOUNDARY: AsiErrorCode = 10;
pub const ASI_ERROR_TIMEOUT: AsiErrorCode = 11;
pub const ASI_ERROR_INVALID_SEQUENCE: AsiErrorCode = 12;
pub const ASI_ERROR_BUFFER_TOO_SMALL: AsiErrorCode = 13;
pub const ASI_ERROR_VIDEO_MODE_ACTIVE: AsiErrorCode = 14;
pub const ASI_ERROR_EXPOSURE_IN_PROGRESS: AsiErrorCode = 15;
pub const ASI_ERROR_GENERAL_ERROR: AsiErrorCode = 16;
pub const ASI_ERROR_INVALID_MODE: AsiErrorCode = 17;

// --- Image types (`ASI_IMG_TYPE`) ---

pub type AsiImgType = c_int;

pub const ASI_IMG_RAW8: AsiImgType = 0;
/// Three bytes per pixel. The SDK documents the order as RGB but delivers the
/// red and blue channels swapped.
pub const ASI_IMG_RGB24: AsiImgType = 1;
pub const ASI_IMG_RAW16: AsiImgType = 2;
pub const ASI_IMG_Y8: AsiImgType = 3;

/// Control type discriminant (`ASI_CONTROL_TYPE`).
pub type AsiControlType = c_int;

/// Decoded vendor error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsiError {
    InvalidIndex,
    InvalidId,
    InvalidControlType,
    CameraClosed,
    CameraRemoved,
    InvalidPath,
    InvalidFileFormat,
    InvalidSize,
    InvalidImgType,
    OutOfBoundary,
    Timeout,
    InvalidSequence,
    BufferTooSmall,
    VideoModeActive,
    ExposureInProgress,
    GeneralError,
    InvalidMode,
    Unknown(AsiErrorCode),
}

impl AsiError {
    /// Decode a raw return code. `ASI_SUCCESS` is not an error.
    pub fn from_code(code: AsiErrorCode) -> Option<Self> {
        let err = match code {
            ASI_SUCCESS => return None,
            ASI_ERROR_INVALID_INDEX => Self::InvalidIndex,
            ASI_ERROR_INVALID_ID => Self::InvalidId,
            ASI_ERROR_INVALID_CONTROL_TYPE => Self::InvalidControlType,
            ASI_ERROR_CAMERA_CLOSED => Self::CameraClosed,
            ASI_ERROR_CAMERA_REMOVED => Self::CameraRemoved,
            ASI_ERROR_INVALID_PATH => Self::InvalidPath,
            ASI_ERROR_INVALID_FILEFORMAT => Self::InvalidFileFormat,
            ASI_ERROR_INVALID_SIZE => Self::InvalidSize,
            ASI_ERROR_INVALID_IMGTYPE => Self::InvalidImgType,
            ASI_ERROR_OUTOF_BOUNDARY => Self::OutOfBoundary,
            ASI_ERROR_TIMEOUT => Self::Timeout,
            ASI_ERROR_INVALID_SEQUENCE => Self::InvalidSequence,
            ASI_ERROR_BUFFER_TOO_SMALL => Self::BufferTooSmall,
            ASI_ERROR_VIDEO_MODE_ACTIVE => Self::VideoModeActive,
            ASI_ERROR_EXPOSURE_IN_PROGRESS => Self::ExposureInProgress,
            ASI_ERROR_GENERAL_ERROR => Self::GeneralError,
            ASI_ERROR_INVALID_MODE => Self::InvalidMode,
            other => Self::Unknown(other),
        };
        Some(err)
    }

    /// Convert a raw return code into a `Result`.
    pub fn check(code: AsiErrorCode) -> std::result::Result<(), Self> {
        match Self::from_code(code) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// The raw vendor code.
    pub fn code(self) -> AsiErrorCode {
        match self {
            Self::InvalidIndex => ASI_ERROR_INVALID_INDEX,
            Self::InvalidId => ASI_ERROR_INVALID_ID,
            Self::InvalidControlType => ASI_ERROR_INVALID_CONTROL_TYPE,
            Self::CameraClosed => ASI_ERROR_CAMERA_CLOSED,
            Self::CameraRemoved => ASI_ERROR_CAMERA_REMOVED,
            Self::InvalidPath => ASI_ERROR_INVALID_PATH,
            Self::InvalidFileFormat => ASI_ERROR_INVALID_FILEFORMAT,
            Self::InvalidSize => ASI_ERROR_INVALID_SIZE,
            Self::InvalidImgType => ASI_ERROR_INVALID_IMGTYPE,
            Self::OutOfBoundary => ASI_ERROR_OUTOF_BOUNDARY,
            Self::Timeout => ASI_ERROR_TIMEOUT,
            Self::InvalidSequence => ASI_ERROR_INVALID_SEQUENCE,
            Self::BufferTooSmall => ASI_ERROR_BUFFER_TOO_SMALL,
            Self::VideoModeActive => ASI_ERROR_VIDEO_MODE_ACTIVE,
            Self::ExposureInProgress => ASI_ERROR_EXPOSURE_IN_PROGRESS,
            Self::GeneralError => ASI_ERROR_GENERAL_ERROR,
            Self::InvalidMode => ASI_ERROR_INVALID_MODE,
            Self::Unknown(code) => code,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::InvalidIndex => "no camera connected or index out of range",
            Self::InvalidId => "invalid camera ID",
            Self::InvalidControlType => "invalid control type",
            Self::CameraClosed => "camera is closed",
            Self::CameraRemoved => "camera was removed",
            Self::InvalidPath => "invalid path",
            Self::InvalidFileFormat => "invalid file format",
            Self::InvalidSize => "invalid video format size",
            Self::InvalidImgType => "unsupported image format",
            Self::OutOfBoundary => "start position outside the sensor",
            Self::Timeout => "capture timed out",
            Self::InvalidSequence => "stop capture first",
            Self::BufferTooSmall => "buffer too small",
            Self::VideoModeActive => "video mode is active",
            Self::ExposureInProgress => "exposure in progress",
            Self::GeneralError => "general error",
            Self::InvalidMode => "invalid mode",
            Self::Unknown(_) => "unknown error",
        }
    }
}

impl fmt::Display for AsiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

/// Camera information returned by `ASIGetCameraProperty`.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AsiCameraInfoRaw {
    /// Model name (null-terminated).
    pub name: [c_char; 64],
    pub camera_id: c_int,
    pub max_height: c_long,
    pub max_width: c_long,
    pub is_color_cam: AsiBool,
    pub bayer_pattern: c_int,
    /// Zero-terminated list of supported bins.
    pub supported_bins: [c_int; 16],
    /// `ASI_IMG_END` (-1) terminated list of image types.
    pub supported_video_format: [AsiImgType; 8],
    /// Pixel size in micrometres.
    pub pixel_size: c_double,
    pub mechanical_shutter: AsiBool,
    pub st4_port: AsiBool,
    pub is_cooler_cam: AsiBool,
    pub is_usb3_host: AsiBool,
    pub is_usb3_camera: AsiBool,
    pub elec_per_adu: c_float,
    pub bit_depth: c_int,
    pub is_trigger_cam: AsiBool,
    pub unused: [c_char; 16],
}

impl AsiCameraInfoRaw {
    /// All-zero value used as an out-parameter and by the mock.
    pub fn zeroed() -> Self {
        Self {
            name: [0; 64],
            camera_id: 0,
            max_height: 0,
            max_width: 0,
            is_color_cam: ASI_FALSE,
            bayer_pattern: 0,
            supported_bins: [0; 16],
            supported_video_format: [-1; 8],
            pixel_size: 0.0,
            mechanical_shutter: ASI_FALSE,
            st4_port: ASI_FALSE,
            is_cooler_cam: ASI_FALSE,
            is_usb3_host: ASI_FALSE,
            is_usb3_camera: ASI_FALSE,
            elec_per_adu: 0.0,
            bit_depth: 0,
            is_trigger_cam: ASI_FALSE,
            unused: [0; 16],
        }
    }

    /// Extract the model name as a Rust string.
    pub fn model_name(&self) -> String {
        read_c_string(&self.name)
    }
}

/// Control capabilities returned by `ASIGetControlCaps`.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AsiControlCapsRaw {
    pub name: [c_char; 64],
    pub description: [c_char; 128],
    pub max_value: c_long,
    pub min_value: c_long,
    pub default_value: c_long,
    pub is_auto_supported: AsiBool,
    pub is_writable: AsiBool,
    pub control_type: AsiControlType,
    pub unused: [c_char; 32],
}

impl AsiControlCapsRaw {
    pub fn zeroed() -> Self {
        Self {
            name: [0; 64],
            description: [0; 128],
            max_value: 0,
            min_value: 0,
            default_value: 0,
            is_auto_supported: ASI_FALSE,
            is_writable: ASI_FALSE,
            control_type: 0,
            unused: [0; 32],
        }
    }

    pub fn name(&self) -> String {
        read_c_string(&self.name)
    }

    pub fn description(&self) -> String {
        read_c_string(&self.description)
    }
}

// `c_long` is 32-bit on Windows and 64-bit elsewhere, so these conversions
// are identities on some targets.

#[allow(clippy::useless_conversion)]
pub fn long_to_i64(value: c_long) -> i64 {
    i64::from(value)
}

#[allow(clippy::unnecessary_fallible_conversions)]
pub fn i64_to_long(value: i64) -> Option<c_long> {
    c_long::try_from(value).ok()
}

#[allow(clippy::unnecessary_fallible_conversions)]
pub fn u32_to_long(value: u32) -> Option<c_long> {
    c_long::try_from(value).ok()
}

/// Copy a string into a fixed-size C buffer, truncating and null-terminating.
pub fn write_c_string(dest: &mut [c_char], value: &str) {
    let len = value.len().min(dest.len().saturating_sub(1));
    for (slot, byte) in dest.iter_mut().zip(value.bytes().take(len)) {
        *slot = byte as c_char;
    }
    if let Some(terminator) = dest.get_mut(len) {
        *terminator = 0;
    }
}

/// Read a null-terminated string out of a fixed-size C buffer.
fn read_c_string(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
