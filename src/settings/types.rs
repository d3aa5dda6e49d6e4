use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::camera::asi::controls::ControlKind;
use crate::camera::types::{Flip, FrameRate, Resolution};

/// Exposure written when a session opens, in microseconds.
pub const DEFAULT_EXPOSURE_US: i64 = 10_000;

/// Everything needed to open a camera and start acquiring.
///
/// Missing fields fall back to their defaults, so older files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Index among connected cameras (not the camera ID).
    pub camera_index: usize,
    pub resolution: Resolution,
    pub frame_rate: FrameRate,
    pub flip: Flip,
    pub exposure_us: i64,
    pub exposure_auto: bool,
    /// Extra control values applied in manual mode after opening.
    pub controls: BTreeMap<ControlKind, i64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            resolution: Resolution::default(),
            frame_rate: FrameRate::default(),
            flip: Flip::default(),
            exposure_us: DEFAULT_EXPOSURE_US,
            exposure_auto: false,
            controls: BTreeMap::new(),
        }
    }
}
