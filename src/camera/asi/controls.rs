//! ASI control passthrough keyed by [`ControlKind`].
//!
//! One get/set pair covers every vendor control; the few normalisations the
//! camera needs (gamma range, auto-exposure ceiling units) live in
//! [`ControlKind::normalise`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::camera::error::{CameraError, Result};
use crate::camera::types::CameraId;

use super::api::AsiSdkApi;
use super::types::{long_to_i64, AsiControlCapsRaw, AsiControlType, ASI_TRUE};

/// Vendor control types, in `ASI_CONTROL_TYPE` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Gain,
    /// Exposure time in microseconds.
    Exposure,
    Gamma,
    WhiteBalanceRed,
    WhiteBalanceBlue,
    /// Also labelled "brightness" by older SDKs.
    Offset,
    BandwidthOverload,
    OverClock,
    /// Sensor temperature ×10, read only.
    Temperature,
    Flip,
    AutoMaxGain,
    /// Auto-exposure ceiling. Set in milliseconds, stored in microseconds.
    AutoMaxExposure,
    AutoTargetBrightness,
    HardwareBin,
    HighSpeedMode,
    CoolerPowerPercent,
    TargetTemperature,
    CoolerOn,
    MonoBin,
    FanOn,
    PatternAdjust,
    AntiDewHeater,
}

impl ControlKind {
    pub const ALL: [ControlKind; 22] = [
        ControlKind::Gain,
        ControlKind::Exposure,
        ControlKind::Gamma,
        ControlKind::WhiteBalanceRed,
        ControlKind::WhiteBalanceBlue,
        ControlKind::Offset,
        ControlKind::BandwidthOverload,
        ControlKind::OverClock,
        ControlKind::Temperature,
        ControlKind::Flip,
        ControlKind::AutoMaxGain,
        ControlKind::AutoMaxExposure,
        ControlKind::AutoTargetBrightness,
        ControlKind::HardwareBin,
        ControlKind::HighSpeedMode,
        ControlKind::CoolerPowerPercent,
        ControlKind::TargetTemperature,
        ControlKind::CoolerOn,
        ControlKind::MonoBin,
        ControlKind::FanOn,
        ControlKind::PatternAdjust,
        ControlKind::AntiDewHeater,
    ];

    /// The vendor `ASI_CONTROL_TYPE` value.
    pub fn asi_code(self) -> AsiControlType {
        self as AsiControlType
    }

    /// Map a vendor control type back to a kind.
    pub fn from_asi_code(code: AsiControlType) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Controls the camera reports but never accepts.
    pub fn is_read_only(self) -> bool {
        self == ControlKind::Temperature
    }

    /// Convert a caller-facing value into the value the SDK expects.
    pub fn normalise(self, value: i64) -> i64 {
        match self {
            ControlKind::Gamma => value.clamp(1, 100),
            ControlKind::AutoMaxExposure => value.saturating_mul(1000),
            _ => value,
        }
    }
}

/// A control reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlValue {
    pub value: i64,
    pub auto: bool,
}

/// Decoded control capabilities.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlCaps {
    /// `None` for control types this crate does not know.
    pub kind: Option<ControlKind>,
    pub name: String,
    pub description: String,
    pub min: i64,
    pub max: i64,
    pub default: i64,
    pub supports_auto: bool,
    pub is_writable: bool,
}

impl From<&AsiControlCapsRaw> for ControlCaps {
    fn from(raw: &AsiControlCapsRaw) -> Self {
        Self {
            kind: ControlKind::from_asi_code(raw.control_type),
            name: raw.name(),
            description: raw.description(),
            min: long_to_i64(raw.min_value),
            max: long_to_i64(raw.max_value),
            default: long_to_i64(raw.default_value),
            supports_auto: raw.is_auto_supported == ASI_TRUE,
            is_writable: raw.is_writable == ASI_TRUE,
        }
    }
}

/// Control access for one opened camera.
///
/// Cheap to clone; safe to use from any thread while the acquisition
/// worker is capturing.
pub struct CameraControls<S: AsiSdkApi> {
    sdk: Arc<S>,
    camera: CameraId,
}

impl<S: AsiSdkApi> Clone for CameraControls<S> {
    fn clone(&self) -> Self {
        Self {
            sdk: Arc::clone(&self.sdk),
            camera: self.camera,
        }
    }
}

impl<S: AsiSdkApi> CameraControls<S> {
    pub fn new(sdk: Arc<S>, camera: CameraId) -> Self {
        Self { sdk, camera }
    }

    pub fn get(&self, kind: ControlKind) -> Result<ControlValue> {
        let (value, auto) = self.sdk.control_value(self.camera, kind)?;
        Ok(ControlValue { value, auto })
    }

    pub fn set(&self, kind: ControlKind, value: i64, auto: bool) -> Result<()> {
        if kind.is_read_only() {
            return Err(CameraError::ControlWrite(format!("{kind:?} is read only")));
        }
        self.sdk
            .set_control_value(self.camera, kind, kind.normalise(value), auto)
    }

    /// Capabilities of the control at `index`.
    pub fn caps(&self, index: usize) -> Result<ControlCaps> {
        let count = self.sdk.num_controls(self.camera)?;
        if index >= count {
            return Err(CameraError::ControlQuery(format!(
                "control index {index} out of range (camera has {count})"
            )));
        }
        let raw = self.sdk.control_caps(self.camera, index)?;
        Ok(ControlCaps::from(&raw))
    }

    /// Capabilities of every control the camera exposes.
    pub fn all_caps(&self) -> Result<Vec<ControlCaps>> {
        let count = self.sdk.num_controls(self.camera)?;
        let mut caps = Vec::with_capacity(count);
        for index in 0..count {
            match self.sdk.control_caps(self.camera, index) {
                Ok(raw) => caps.push(ControlCaps::from(&raw)),
                Err(e) => tracing::debug!("control {index} unavailable on {}: {e}", self.camera),
            }
        }
        Ok(caps)
    }
}
