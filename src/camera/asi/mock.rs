//! Mock ASI SDK for testing without a camera or the vendor library.
//!
//! Uses a builder pattern to configure cameras, frame payloads, and error
//! injection. Captures can be held in flight with [`MockAsiSdk::hold_captures`]
//! so tests can observe the pipeline mid-capture.

use std::collections::HashMap;
use std::os::raw::c_long;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::camera::error::{CameraError, Result};
use crate::camera::types::CameraId;

use super::api::AsiSdkApi;
use super::controls::ControlKind;
use super::types::{
    long_to_i64, u32_to_long, write_c_string, AsiCameraInfoRaw, AsiControlCapsRaw, AsiError,
    AsiImgType, ASI_FALSE, ASI_IMG_RAW8, ASI_IMG_RGB24, ASI_IMG_Y8, ASI_TRUE,
};

/// Exposure reported before anything is written, in microseconds.
const DEFAULT_EXPOSURE_US: c_long = 10_000;

/// A simulated camera.
#[derive(Debug, Clone)]
struct MockCamera {
    info: AsiCameraInfoRaw,
    is_open: bool,
    is_initialised: bool,
    video_active: bool,
    close_count: u32,
    roi: Option<(u32, u32, u32, AsiImgType)>,
    start_pos: Option<(u32, u32)>,
    controls: HashMap<ControlKind, (i64, bool)>,
}

/// Configurable error injection for a specific operation.
#[derive(Debug, Clone)]
struct ErrorInjection {
    operation: &'static str,
    error: AsiError,
}

#[derive(Debug)]
struct MockState {
    cameras: Vec<MockCamera>,
    frame_pattern: Vec<u8>,
    capture_failure: Option<AsiError>,
    hold_captures: bool,
    captures_started: u64,
    captures_finished: u64,
    capture_timeouts: Vec<i32>,
    error_injections: Vec<ErrorInjection>,
}

/// Mock ASICamera2 implementation.
///
/// All state is behind a `Mutex` so the mock satisfies `Send + Sync`.
pub struct MockAsiSdk {
    state: Mutex<MockState>,
    capture_signal: Condvar,
}

impl MockAsiSdk {
    /// Create a new empty mock (no cameras).
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                cameras: Vec::new(),
                frame_pattern: vec![0, 0, 0],
                capture_failure: None,
                hold_captures: false,
                captures_started: 0,
                captures_finished: 0,
                capture_timeouts: Vec::new(),
                error_injections: Vec::new(),
            }),
            capture_signal: Condvar::new(),
        }
    }

    /// Add a colour camera with a specific model name and sensor size.
    pub fn with_camera(self, model: &str, max_width: u32, max_height: u32) -> Self {
        {
            let mut state = self.state.lock();
            let index = state.cameras.len();
            let mut info = AsiCameraInfoRaw::zeroed();
            write_c_string(&mut info.name, model);
            info.camera_id = i32::try_from(index).unwrap_or(i32::MAX);
            info.max_width = u32_to_long(max_width).unwrap_or(c_long::MAX);
            info.max_height = u32_to_long(max_height).unwrap_or(c_long::MAX);
            info.is_color_cam = ASI_TRUE;
            info.is_usb3_host = ASI_TRUE;
            info.is_usb3_camera = ASI_TRUE;
            info.pixel_size = 4.63;
            info.bit_depth = 14;

            let mut controls = HashMap::new();
            controls.insert(ControlKind::Exposure, (long_to_i64(DEFAULT_EXPOSURE_US), false));

            state.cameras.push(MockCamera {
                info,
                is_open: false,
                is_initialised: false,
                video_active: false,
                close_count: 0,
                roi: None,
                start_pos: None,
                controls,
            });
        }
        self
    }

    /// Add N cameras with auto-generated names and a 4144×2822 sensor.
    pub fn with_cameras(self, count: usize) -> Self {
        let mut result = self;
        for i in 0..count {
            result = result.with_camera(&format!("ZWO ASI Mock {}", i + 1), 4144, 2822);
        }
        result
    }

    /// Bytes repeated across the capture buffer on every successful capture.
    pub fn with_frame_pattern(self, pattern: Vec<u8>) -> Self {
        self.set_frame_pattern(pattern);
        self
    }

    /// Inject an error for a specific operation name. Fires once.
    ///
    /// Operation names match the `AsiSdkApi` method names, e.g.
    /// `"open_camera"`, `"set_roi_format"`, `"video_data"`.
    pub fn with_error(self, operation: &'static str, error: AsiError) -> Self {
        self.state
            .lock()
            .error_injections
            .push(ErrorInjection { operation, error });
        self
    }

    /// Replace the frame payload at runtime.
    pub fn set_frame_pattern(&self, pattern: Vec<u8>) {
        self.state.lock().frame_pattern = pattern;
    }

    /// Make every capture fail with `error` until cleared with `None`.
    pub fn set_capture_failure(&self, error: Option<AsiError>) {
        self.state.lock().capture_failure = error;
    }

    /// Block captures once they start, until [`Self::release_captures`].
    pub fn hold_captures(&self) {
        self.state.lock().hold_captures = true;
    }

    /// Let held captures (and future ones) run.
    pub fn release_captures(&self) {
        self.state.lock().hold_captures = false;
        self.capture_signal.notify_all();
    }

    /// Number of `video_data` calls that have started.
    pub fn captures_started(&self) -> u64 {
        self.state.lock().captures_started
    }

    /// Number of `video_data` calls that have returned.
    pub fn captures_finished(&self) -> u64 {
        self.state.lock().captures_finished
    }

    /// Wait timeouts passed to each `video_data` call, in order.
    pub fn capture_timeouts(&self) -> Vec<i32> {
        self.state.lock().capture_timeouts.clone()
    }

    /// Block until at least `count` captures have started.
    pub fn wait_for_captures_started(&self, count: u64, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| state.captures_started >= count)
    }

    /// Block until at least `count` captures have returned.
    pub fn wait_for_captures_finished(&self, count: u64, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| state.captures_finished >= count)
    }

    /// Current value of a control, if the camera exists.
    pub fn control(&self, camera: CameraId, kind: ControlKind) -> Option<(i64, bool)> {
        let state = self.state.lock();
        let cam = state.camera(camera).ok()?;
        Some(cam.controls.get(&kind).copied().unwrap_or((0, false)))
    }

    pub fn is_open(&self, camera: CameraId) -> bool {
        let state = self.state.lock();
        state.camera(camera).is_ok_and(|c| c.is_open)
    }

    pub fn is_video_active(&self, camera: CameraId) -> bool {
        let state = self.state.lock();
        state.camera(camera).is_ok_and(|c| c.video_active)
    }

    /// How many times `close_camera` succeeded for this camera.
    pub fn close_count(&self, camera: CameraId) -> u32 {
        let state = self.state.lock();
        state.camera(camera).map_or(0, |c| c.close_count)
    }

    /// ROI set on the camera as `(width, height, bin, img_type)`.
    pub fn roi(&self, camera: CameraId) -> Option<(u32, u32, u32, AsiImgType)> {
        let state = self.state.lock();
        state.camera(camera).ok().and_then(|c| c.roi)
    }

    pub fn start_pos(&self, camera: CameraId) -> Option<(u32, u32)> {
        let state = self.state.lock();
        state.camera(camera).ok().and_then(|c| c.start_pos)
    }

    fn wait_until(&self, timeout: Duration, done: impl Fn(&MockState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !done(&state) {
            if self
                .capture_signal
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return done(&state);
            }
        }
        true
    }
}

impl Default for MockAsiSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    /// Check for injected errors for the given operation.
    fn check_error(&mut self, operation: &str) -> std::result::Result<(), AsiError> {
        if let Some(pos) = self
            .error_injections
            .iter()
            .position(|e| e.operation == operation)
        {
            return Err(self.error_injections.remove(pos).error);
        }
        Ok(())
    }

    fn camera(&self, camera: CameraId) -> std::result::Result<&MockCamera, AsiError> {
        usize::try_from(camera.0)
            .ok()
            .and_then(|idx| self.cameras.get(idx))
            .ok_or(AsiError::InvalidId)
    }

    fn camera_mut(&mut self, camera: CameraId) -> std::result::Result<&mut MockCamera, AsiError> {
        usize::try_from(camera.0)
            .ok()
            .and_then(|idx| self.cameras.get_mut(idx))
            .ok_or(AsiError::InvalidId)
    }

    fn open_camera_mut(
        &mut self,
        camera: CameraId,
    ) -> std::result::Result<&mut MockCamera, AsiError> {
        let cam = self.camera_mut(camera)?;
        if !cam.is_open {
            return Err(AsiError::CameraClosed);
        }
        Ok(cam)
    }
}

impl AsiSdkApi for MockAsiSdk {
    fn num_connected_cameras(&self) -> usize {
        self.state.lock().cameras.len()
    }

    fn camera_property(&self, index: usize) -> Result<AsiCameraInfoRaw> {
        let call = "ASIGetCameraProperty";
        let mut state = self.state.lock();
        state
            .check_error("camera_property")
            .map_err(|e| CameraError::sdk(call, e))?;
        state
            .cameras
            .get(index)
            .map(|c| c.info)
            .ok_or(CameraError::sdk(call, AsiError::InvalidIndex))
    }

    fn open_camera(&self, camera: CameraId) -> Result<()> {
        let call = "ASIOpenCamera";
        let mut state = self.state.lock();
        state
            .check_error("open_camera")
            .map_err(|e| CameraError::sdk(call, e))?;
        let cam = state
            .camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        cam.is_open = true;
        Ok(())
    }

    fn init_camera(&self, camera: CameraId) -> Result<()> {
        let call = "ASIInitCamera";
        let mut state = self.state.lock();
        state
            .check_error("init_camera")
            .map_err(|e| CameraError::sdk(call, e))?;
        let cam = state
            .open_camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        cam.is_initialised = true;
        Ok(())
    }

    fn close_camera(&self, camera: CameraId) -> Result<()> {
        let call = "ASICloseCamera";
        let mut state = self.state.lock();
        state
            .check_error("close_camera")
            .map_err(|e| CameraError::sdk(call, e))?;
        let cam = state
            .camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        cam.is_open = false;
        cam.is_initialised = false;
        cam.video_active = false;
        cam.close_count += 1;
        Ok(())
    }

    fn num_controls(&self, camera: CameraId) -> Result<usize> {
        let call = "ASIGetNumOfControls";
        let mut state = self.state.lock();
        state
            .check_error("num_controls")
            .map_err(|e| CameraError::sdk(call, e))?;
        state
            .open_camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        Ok(ControlKind::ALL.len())
    }

    fn control_caps(&self, camera: CameraId, index: usize) -> Result<AsiControlCapsRaw> {
        let call = "ASIGetControlCaps";
        let mut state = self.state.lock();
        state
            .check_error("control_caps")
            .map_err(|e| CameraError::sdk(call, e))?;
        state
            .open_camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        let kind = ControlKind::ALL
            .get(index)
            .copied()
            .ok_or(CameraError::sdk(call, AsiError::InvalidIndex))?;

        let mut caps = AsiControlCapsRaw::zeroed();
        let name = format!("{kind:?}");
        write_c_string(&mut caps.name, &name);
        write_c_string(&mut caps.description, &format!("Mock {name} control"));
        caps.min_value = 0;
        caps.max_value = 1_000_000;
        caps.default_value = if kind == ControlKind::Exposure {
            DEFAULT_EXPOSURE_US
        } else {
            0
        };
        caps.is_auto_supported = ASI_TRUE;
        caps.is_writable = if kind == ControlKind::Temperature {
            ASI_FALSE
        } else {
            ASI_TRUE
        };
        caps.control_type = kind.asi_code();
        Ok(caps)
    }

    fn control_value(&self, camera: CameraId, control: ControlKind) -> Result<(i64, bool)> {
        let call = "ASIGetControlValue";
        let mut state = self.state.lock();
        state
            .check_error("control_value")
            .map_err(|e| CameraError::sdk(call, e))?;
        let cam = state
            .open_camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        Ok(cam.controls.get(&control).copied().unwrap_or((0, false)))
    }

    fn set_control_value(
        &self,
        camera: CameraId,
        control: ControlKind,
        value: i64,
        auto: bool,
    ) -> Result<()> {
        let call = "ASISetControlValue";
        let mut state = self.state.lock();
        state
            .check_error("set_control_value")
            .map_err(|e| CameraError::sdk(call, e))?;
        let cam = state
            .open_camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        cam.controls.insert(control, (value, auto));
        Ok(())
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
        let mut state = self.state.lock();
        state
            .check_error("set_roi_format")
            .map_err(|e| CameraError::sdk(call, e))?;
        let cam = state
            .open_camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        if !(ASI_IMG_RAW8..=ASI_IMG_Y8).contains(&img_type) {
            return Err(CameraError::sdk(call, AsiError::InvalidImgType));
        }
        if i64::from(width) > long_to_i64(cam.info.max_width)
            || i64::from(height) > long_to_i64(cam.info.max_height)
        {
            return Err(CameraError::sdk(call, AsiError::InvalidSize));
        }
        cam.roi = Some((width, height, bin, img_type));
        Ok(())
    }

    fn set_start_pos(&self, camera: CameraId, x: u32, y: u32) -> Result<()> {
        let call = "ASISetStartPos";
        let mut state = self.state.lock();
        state
            .check_error("set_start_pos")
            .map_err(|e| CameraError::sdk(call, e))?;
        let cam = state
            .open_camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        cam.start_pos = Some((x, y));
        Ok(())
    }

    fn start_video_capture(&self, camera: CameraId) -> Result<()> {
        let call = "ASIStartVideoCapture";
        let mut state = self.state.lock();
        state
            .check_error("start_video_capture")
            .map_err(|e| CameraError::sdk(call, e))?;
        let cam = state
            .open_camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        if !cam.is_initialised {
            return Err(CameraError::sdk(call, AsiError::InvalidSequence));
        }
        cam.video_active = true;
        Ok(())
    }

    fn stop_video_capture(&self, camera: CameraId) -> Result<()> {
        let call = "ASIStopVideoCapture";
        let mut state = self.state.lock();
        state
            .check_error("stop_video_capture")
            .map_err(|e| CameraError::sdk(call, e))?;
        let cam = state
            .open_camera_mut(camera)
            .map_err(|e| CameraError::sdk(call, e))?;
        cam.video_active = false;
        Ok(())
    }

    fn video_data(&self, camera: CameraId, buffer: &mut [u8], wait_ms: i32) -> Result<()> {
        let mut state = self.state.lock();
        state.captures_started += 1;
        state.capture_timeouts.push(wait_ms);
        self.capture_signal.notify_all();

        while state.hold_captures {
            self.capture_signal.wait(&mut state);
        }

        let outcome = capture_into(&mut state, camera, buffer);
        state.captures_finished += 1;
        self.capture_signal.notify_all();
        outcome.map_err(CameraError::Capture)
    }
}

/// Body of a mock capture, run with the state lock held.
fn capture_into(
    state: &mut MockState,
    camera: CameraId,
    buffer: &mut [u8],
) -> std::result::Result<(), AsiError> {
    state.check_error("video_data")?;
    if let Some(err) = state.capture_failure {
        return Err(err);
    }
    let cam = state.camera(camera)?;
    if !cam.is_open {
        return Err(AsiError::CameraClosed);
    }
    if !cam.video_active {
        return Err(AsiError::InvalidSequence);
    }
    if state.frame_pattern.is_empty() {
        return Err(AsiError::GeneralError);
    }
    for (dst, src) in buffer.iter_mut().zip(state.frame_pattern.iter().cycle()) {
        *dst = *src;
    }
    Ok(())
}
