use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::camera::asi::types::{AsiCameraInfoRaw, ASI_TRUE};

/// Vendor camera ID as assigned by `ASIGetCameraProperty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CameraId(pub i32);

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asi:{}", self.0)
    }
}

/// Discovered camera and its sensor capabilities.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    pub id: CameraId,
    pub name: String,
    pub max_width: u32,
    pub max_height: u32,
    pub is_color: bool,
    pub is_cooler: bool,
    pub is_usb3_host: bool,
    pub is_usb3_camera: bool,
    pub has_st4_port: bool,
    pub has_mechanical_shutter: bool,
    /// Pixel size in micrometres.
    pub pixel_size_um: f64,
    pub bit_depth: u32,
}

impl From<&AsiCameraInfoRaw> for CameraInfo {
    fn from(raw: &AsiCameraInfoRaw) -> Self {
        Self {
            id: CameraId(raw.camera_id),
            name: raw.model_name(),
            max_width: u32::try_from(raw.max_width).unwrap_or(0),
            max_height: u32::try_from(raw.max_height).unwrap_or(0),
            is_color: raw.is_color_cam == ASI_TRUE,
            is_cooler: raw.is_cooler_cam == ASI_TRUE,
            is_usb3_host: raw.is_usb3_host == ASI_TRUE,
            is_usb3_camera: raw.is_usb3_camera == ASI_TRUE,
            has_st4_port: raw.st4_port == ASI_TRUE,
            has_mechanical_shutter: raw.mechanical_shutter == ASI_TRUE,
            pixel_size_um: raw.pixel_size,
            bit_depth: u32::try_from(raw.bit_depth).unwrap_or(0),
        }
    }
}

/// Capture resolution presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    #[default]
    Hd1024x768,
    Hd720,
    Hd960,
    Hd1080,
    /// The full sensor, as reported by the camera.
    Max,
}

impl Resolution {
    pub const ALL: [Resolution; 5] = [
        Resolution::Hd1024x768,
        Resolution::Hd720,
        Resolution::Hd960,
        Resolution::Hd1080,
        Resolution::Max,
    ];

    /// Fixed `(width, height)`, or `None` for [`Resolution::Max`].
    pub fn fixed_size(self) -> Option<(u32, u32)> {
        match self {
            Resolution::Hd1024x768 => Some((1024, 768)),
            Resolution::Hd720 => Some((1280, 720)),
            Resolution::Hd960 => Some((1280, 960)),
            Resolution::Hd1080 => Some((1920, 1080)),
            Resolution::Max => None,
        }
    }

    /// Resolve against a sensor's maximum size.
    pub fn resolve(self, max_width: u32, max_height: u32) -> (u32, u32) {
        self.fixed_size().unwrap_or((max_width, max_height))
    }
}

/// Display frame-rate presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRate {
    Fps5,
    Fps8,
    Fps15,
    #[default]
    Fps24,
    Fps30,
    Fps35,
    Fps40,
}

impl FrameRate {
    pub const ALL: [FrameRate; 7] = [
        FrameRate::Fps5,
        FrameRate::Fps8,
        FrameRate::Fps15,
        FrameRate::Fps24,
        FrameRate::Fps30,
        FrameRate::Fps35,
        FrameRate::Fps40,
    ];

    pub fn fps(self) -> u32 {
        match self {
            FrameRate::Fps5 => 5,
            FrameRate::Fps8 => 8,
            FrameRate::Fps15 => 15,
            FrameRate::Fps24 => 24,
            FrameRate::Fps30 => 30,
            FrameRate::Fps35 => 35,
            FrameRate::Fps40 => 40,
        }
    }

    /// Look up the preset for a numeric rate.
    pub fn from_fps(fps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.fps() == fps)
    }

    /// Minimum time between displayed frames (`1 / fps`).
    pub fn throttle_interval(self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps()))
    }
}

/// Image flip applied by the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flip {
    None,
    Horizontal,
    Vertical,
    #[default]
    Both,
}

impl Flip {
    /// Value written to the flip control.
    pub fn control_value(self) -> i64 {
        match self {
            Flip::None => 0,
            Flip::Horizontal => 1,
            Flip::Vertical => 2,
            Flip::Both => 3,
        }
    }
}
