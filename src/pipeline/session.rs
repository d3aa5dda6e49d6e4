//! One acquisition session: worker thread, shared state, buffers, and the
//! consumer clock for a single opened device.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::camera::asi::api::AsiSdkApi;
use crate::camera::asi::device::AsiCamera;
use crate::camera::error::Result;
use crate::camera::source::{ExposureProvider, FrameSource};
use crate::camera::types::FrameRate;
use crate::diagnostics::stats::{PipelineSnapshot, PipelineStats};
use crate::settings::types::SessionSettings;

use super::buffers::FrameBuffers;
use super::clock::{ConsumerClock, TickOutcome};
use super::sink::FrameSink;
use super::state::{PipelineState, UpdateState};
use super::worker::{self, Shared};

/// Frame size and display rate, fixed for a session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
}

impl SessionConfig {
    pub fn new(width: u32, height: u32, frame_rate: FrameRate) -> Self {
        Self {
            width,
            height,
            frame_rate,
        }
    }
}

/// A running acquisition pipeline.
///
/// Drive it by calling [`Session::tick`] from the display loop. Dropping the
/// session terminates it.
pub struct Session<F: FrameSource> {
    shared: Arc<Shared>,
    clock: ConsumerClock,
    worker: Option<JoinHandle<F>>,
    config: SessionConfig,
}

impl<F: FrameSource> Session<F> {
    /// Allocate the buffers and start the worker against `source`.
    ///
    /// # Errors
    ///
    /// `Resource` if the buffers cannot be allocated or the worker thread
    /// cannot be spawned. No worker runs in that case and `source` is
    /// dropped.
    pub fn start(source: F, exposure: ExposureProvider, config: SessionConfig) -> Result<Self> {
        let buffers = FrameBuffers::new(config.width, config.height)?;
        let shared = Arc::new(Shared {
            state: PipelineState::new(),
            buffers: Mutex::new(buffers),
            stats: Mutex::new(PipelineStats::new()),
        });

        let worker = worker::spawn(
            format!("asicam-acq-{}x{}", config.width, config.height),
            source,
            exposure,
            Arc::clone(&shared),
        )?;

        tracing::info!(
            "Acquisition session started at {}x{}, {} fps",
            config.width,
            config.height,
            config.frame_rate.fps()
        );

        Ok(Self {
            shared,
            clock: ConsumerClock::new(config.frame_rate.throttle_interval()),
            worker: Some(worker),
            config,
        })
    }

    /// Advance the consumer clock by `dt`, committing a completed frame to
    /// `sink` when one is due.
    pub fn tick(&mut self, dt: Duration, sink: &mut dyn FrameSink) -> TickOutcome {
        self.clock.tick(
            dt,
            &self.shared.state,
            &self.shared.buffers,
            sink,
            &self.shared.stats,
        )
    }

    /// Stop starting new captures. A capture already running finishes and
    /// its result is discarded.
    pub fn pause(&self) -> bool {
        let paused = self.shared.state.pause();
        if paused {
            tracing::debug!("Acquisition paused");
        }
        paused
    }

    /// Resume from `Paused`, requesting a fresh capture. No-op otherwise.
    pub fn resume(&self) -> bool {
        let resumed = self.shared.state.resume();
        if resumed {
            tracing::debug!("Acquisition resumed");
        }
        resumed
    }

    /// Stop the worker and release the buffers and the device.
    ///
    /// Returns `false` if the session was already terminated.
    pub fn terminate(&mut self) -> bool {
        if !self.shared.state.terminate() {
            return false;
        }

        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(source) => drop(source),
                Err(_) => tracing::warn!("Acquisition worker panicked"),
            }
        }
        self.shared.buffers.lock().release();

        tracing::info!(
            "Acquisition session terminated after {} frames",
            self.clock.frame_counter()
        );
        true
    }

    pub fn state(&self) -> UpdateState {
        self.shared.state.load()
    }

    pub fn is_terminated(&self) -> bool {
        self.state() == UpdateState::Terminated
    }

    /// Completed cycles, successful or failed.
    pub fn frame_counter(&self) -> u64 {
        self.clock.frame_counter()
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// `(raw bytes, surface pixels)` currently allocated.
    ///
    /// Returns `None` while the worker holds the buffers, which spans the
    /// whole device capture and conversion. Use [`Session::config`] for the
    /// frame size.
    pub fn buffer_sizes(&self) -> Option<(usize, usize)> {
        let buffers = self.shared.buffers.try_lock()?;
        Some((buffers.raw.len(), buffers.surface.pixels().len()))
    }

    pub fn diagnostics(&self) -> PipelineSnapshot {
        self.shared.stats.lock().snapshot()
    }
}

impl<S: AsiSdkApi + 'static> Session<AsiCamera<S>> {
    /// Open an ASI camera from `settings`, apply flip, exposure, and saved
    /// controls, and start acquiring.
    pub fn open_asi(sdk: Arc<S>, settings: &SessionSettings) -> Result<Self> {
        let camera = AsiCamera::open(sdk, settings.camera_index, settings.resolution)?;
        camera.set_flip(settings.flip)?;
        camera.set_exposure(settings.exposure_us, settings.exposure_auto)?;

        let controls = camera.controls();
        for (&kind, &value) in &settings.controls {
            if kind.is_read_only() {
                tracing::warn!("Ignoring saved value for read-only control {kind:?}");
                continue;
            }
            controls.set(kind, value, false)?;
        }

        let (width, height) = camera.size();
        let exposure = camera.exposure_provider();
        Self::start(
            camera,
            exposure,
            SessionConfig::new(width, height, settings.frame_rate),
        )
    }
}

impl<F: FrameSource> Drop for Session<F> {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::asi::controls::ControlKind;
    use crate::camera::asi::mock::MockAsiSdk;
    use crate::camera::asi::types::AsiError;
    use crate::camera::error::CameraError;
    use crate::camera::source::fixed_timeout;
    use crate::camera::types::{CameraId, Flip, Resolution};
    use crate::pipeline::buffers::PixelSurface;
    use crate::pipeline::sink::OutputImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    const MS: Duration = Duration::from_millis(1);
    const TIMEOUT: Duration = Duration::from_secs(5);

    fn hd720_settings() -> SessionSettings {
        SessionSettings {
            resolution: Resolution::Hd720,
            ..SessionSettings::default()
        }
    }

    fn mock_sdk() -> Arc<MockAsiSdk> {
        Arc::new(
            MockAsiSdk::new()
                .with_camera("ZWO ASI462MC", 1936, 1096)
                .with_frame_pattern(vec![10, 20, 30]),
        )
    }

    fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + TIMEOUT;
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            std::thread::sleep(MS);
        }
    }

    fn wait_for_state<F: FrameSource>(session: &Session<F>, want: UpdateState) {
        wait_until(&format!("{want:?}"), || session.state() == want);
    }

    /// Request a capture, wait for the worker, and tick once more.
    fn run_cycle<F: FrameSource>(
        session: &mut Session<F>,
        sink: &mut dyn FrameSink,
    ) -> TickOutcome {
        let interval = session.config().frame_rate.throttle_interval();
        assert_eq!(session.tick(interval, sink), TickOutcome::Requested);
        wait_until("cycle to finish", || {
            matches!(
                session.state(),
                UpdateState::Completed | UpdateState::Failed
            )
        });
        session.tick(MS, sink)
    }

    /// Frame source that records where the device was asked to write.
    struct RecordingSource {
        dest_ptrs: Arc<Mutex<Vec<usize>>>,
    }

    impl FrameSource for RecordingSource {
        fn capture(&mut self, dest: &mut [u8], _timeout_ms: i32) -> Result<()> {
            self.dest_ptrs.lock().push(dest.as_ptr() as usize);
            dest.fill(5);
            Ok(())
        }
    }

    /// Sink that records which surface allocation it was handed.
    #[derive(Default)]
    struct PointerSink {
        surface_ptrs: Vec<usize>,
    }

    impl FrameSink for PointerSink {
        fn commit(&mut self, surface: &PixelSurface) {
            self.surface_ptrs.push(surface.pixels().as_ptr() as usize);
        }
    }

    #[test]
    fn end_to_end_hd720_at_24_fps() {
        let sdk = mock_sdk();
        let mut session = Session::open_asi(Arc::clone(&sdk), &hd720_settings()).unwrap();
        let mut sink = OutputImage::new();

        assert_eq!(session.state(), UpdateState::Idle);
        assert_eq!(session.buffer_sizes(), Some((2_764_800, 921_600)));

        // Below the 41.67 ms interval nothing happens.
        assert_eq!(session.tick(Duration::from_millis(41), &mut sink), TickOutcome::Throttled);
        assert_eq!(session.tick(MS, &mut sink), TickOutcome::Requested);

        wait_for_state(&session, UpdateState::Completed);
        assert_eq!(session.tick(MS, &mut sink), TickOutcome::Applied { frame: 1 });

        assert_eq!(session.frame_counter(), 1);
        assert_eq!(session.state(), UpdateState::Idle);
        assert_eq!((sink.width(), sink.height()), (1280, 720));
        assert_eq!(sink.rgba().len(), 1280 * 720 * 4);
        assert_eq!(&sink.rgba()[..8], &[30, 20, 10, 255, 30, 20, 10, 255]);
        assert_eq!(session.diagnostics().frames_applied, 1);
    }

    #[test]
    fn open_applies_flip_exposure_and_saved_controls() {
        let sdk = mock_sdk();
        let mut settings = hd720_settings();
        settings.flip = Flip::Horizontal;
        settings.exposure_us = 4_000;
        settings.controls.insert(ControlKind::Gain, 250);

        let _session = Session::open_asi(Arc::clone(&sdk), &settings).unwrap();
        let id = CameraId(0);
        assert_eq!(sdk.control(id, ControlKind::Flip), Some((1, false)));
        assert_eq!(sdk.control(id, ControlKind::Exposure), Some((4_000, false)));
        assert_eq!(sdk.control(id, ControlKind::Gain), Some((250, false)));
    }

    #[test]
    fn capture_timeout_follows_live_exposure() {
        let sdk = mock_sdk();
        let mut session = Session::open_asi(Arc::clone(&sdk), &hd720_settings()).unwrap();
        let mut sink = OutputImage::new();

        run_cycle(&mut session, &mut sink);
        sdk.set_control_value(CameraId(0), ControlKind::Exposure, 100, false)
            .unwrap();
        run_cycle(&mut session, &mut sink);

        assert_eq!(sdk.capture_timeouts(), vec![20_500, 700]);
    }

    #[test]
    fn exposure_provider_is_called_once_per_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider: ExposureProvider = {
            let calls = Arc::clone(&calls);
            Box::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                500
            })
        };
        let source = RecordingSource {
            dest_ptrs: Arc::default(),
        };
        let mut session =
            Session::start(source, provider, SessionConfig::new(16, 4, FrameRate::Fps40)).unwrap();
        let mut sink = OutputImage::new();

        for _ in 0..3 {
            run_cycle(&mut session, &mut sink);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_capture_advances_counter_and_keeps_output() {
        let sdk = mock_sdk();
        let mut session = Session::open_asi(Arc::clone(&sdk), &hd720_settings()).unwrap();
        let mut sink = OutputImage::new();

        assert_eq!(run_cycle(&mut session, &mut sink), TickOutcome::Applied { frame: 1 });

        sdk.set_capture_failure(Some(AsiError::Timeout));
        sdk.set_frame_pattern(vec![1, 2, 3]);
        assert_eq!(run_cycle(&mut session, &mut sink), TickOutcome::Failed { frame: 2 });
        assert_eq!(sink.commits(), 1);
        assert_eq!(&sink.rgba()[..4], &[30, 20, 10, 255]);

        sdk.set_capture_failure(None);
        assert_eq!(run_cycle(&mut session, &mut sink), TickOutcome::Applied { frame: 3 });
        assert_eq!(&sink.rgba()[..4], &[3, 2, 1, 255]);

        let stats = session.diagnostics();
        assert_eq!(stats.frames_applied, 2);
        assert_eq!(stats.failed_cycles, 1);
    }

    #[test]
    fn buffers_are_reused_for_the_whole_session() {
        let dest_ptrs = Arc::new(Mutex::new(Vec::new()));
        let source = RecordingSource {
            dest_ptrs: Arc::clone(&dest_ptrs),
        };
        let config = SessionConfig::new(1280, 720, FrameRate::Fps24);
        let mut session = Session::start(source, fixed_timeout(500), config).unwrap();
        let mut sink = PointerSink::default();

        for _ in 0..3 {
            assert!(matches!(
                run_cycle(&mut session, &mut sink),
                TickOutcome::Applied { .. }
            ));
        }

        let dest_ptrs = dest_ptrs.lock().clone();
        assert_eq!(dest_ptrs.len(), 3);
        assert!(dest_ptrs.iter().all(|&p| p == dest_ptrs[0]));
        assert_eq!(sink.surface_ptrs.len(), 3);
        assert!(sink.surface_ptrs.iter().all(|&p| p == sink.surface_ptrs[0]));
        assert_eq!(session.buffer_sizes(), Some((2_764_800, 921_600)));
    }

    #[test]
    fn paused_session_starts_no_captures() {
        let sdk = mock_sdk();
        let mut session = Session::open_asi(Arc::clone(&sdk), &hd720_settings()).unwrap();
        let mut sink = OutputImage::new();

        assert!(session.pause());
        for _ in 0..200 {
            let outcome = session.tick(MS, &mut sink);
            assert!(
                matches!(outcome, TickOutcome::Throttled | TickOutcome::Paused),
                "unexpected {outcome:?} while paused"
            );
        }
        // Past the throttle interval every tick reports the pause.
        assert_eq!(session.tick(MS, &mut sink), TickOutcome::Paused);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(sdk.captures_started(), 0);
        assert_eq!(session.frame_counter(), 0);

        assert!(session.resume());
        assert!(!session.resume());
        assert!(sdk.wait_for_captures_finished(1, TIMEOUT));
        wait_for_state(&session, UpdateState::Completed);
        assert_eq!(session.tick(MS, &mut sink), TickOutcome::Applied { frame: 1 });
    }

    #[test]
    fn capture_finishing_while_paused_is_dropped() {
        let sdk = mock_sdk();
        let mut session = Session::open_asi(Arc::clone(&sdk), &hd720_settings()).unwrap();
        let mut sink = OutputImage::new();

        sdk.hold_captures();
        assert_eq!(
            session.tick(Duration::from_millis(42), &mut sink),
            TickOutcome::Requested
        );
        assert!(sdk.wait_for_captures_started(1, TIMEOUT));
        assert_eq!(session.state(), UpdateState::Capturing);
        assert_eq!(session.buffer_sizes(), None);
        assert_eq!((session.config().width, session.config().height), (1280, 720));

        assert!(session.pause());
        sdk.release_captures();
        wait_until("stranded capture", || {
            session.diagnostics().stranded_captures == 1
        });

        assert_eq!(session.state(), UpdateState::Paused);
        assert_eq!(session.tick(Duration::from_millis(100), &mut sink), TickOutcome::Paused);
        assert_eq!(session.frame_counter(), 0);
        assert_eq!(sink.commits(), 0);

        // Resume starts a fresh capture rather than surfacing the old one.
        assert!(session.resume());
        assert!(sdk.wait_for_captures_finished(2, TIMEOUT));
        wait_for_state(&session, UpdateState::Completed);
        assert_eq!(session.tick(MS, &mut sink), TickOutcome::Applied { frame: 1 });
        assert_eq!(sink.commits(), 1);
    }

    #[test]
    fn failing_capture_while_paused_is_dropped() {
        let sdk = mock_sdk();
        let mut session = Session::open_asi(Arc::clone(&sdk), &hd720_settings()).unwrap();
        let mut sink = OutputImage::new();

        sdk.hold_captures();
        sdk.set_capture_failure(Some(AsiError::Timeout));
        assert_eq!(
            session.tick(Duration::from_millis(42), &mut sink),
            TickOutcome::Requested
        );
        assert!(sdk.wait_for_captures_started(1, TIMEOUT));

        assert!(session.pause());
        sdk.release_captures();
        wait_until("stranded capture", || {
            session.diagnostics().stranded_captures == 1
        });

        assert_eq!(session.state(), UpdateState::Paused);
        assert_eq!(session.tick(Duration::from_millis(100), &mut sink), TickOutcome::Paused);
        assert_eq!(session.frame_counter(), 0);
        assert_eq!(session.diagnostics().failed_cycles, 0);
    }

    #[test]
    fn persistent_failure_fails_at_the_throttle_rate() {
        let sdk = mock_sdk();
        sdk.set_capture_failure(Some(AsiError::Timeout));
        let mut session = Session::open_asi(Arc::clone(&sdk), &hd720_settings()).unwrap();
        let mut sink = OutputImage::new();
        let mut failed_at = Vec::new();

        for elapsed_ms in 1..=1000u64 {
            if matches!(session.state(), UpdateState::Ready | UpdateState::Capturing) {
                wait_until("failed capture", || session.state() == UpdateState::Failed);
            }
            if let TickOutcome::Failed { .. } = session.tick(MS, &mut sink) {
                failed_at.push(elapsed_ms);
            }
        }

        assert!(failed_at.len() >= 20, "only {} failures", failed_at.len());
        for pair in failed_at.windows(2) {
            assert!(pair[1] - pair[0] >= 42, "failures too close: {pair:?}");
        }
        assert_eq!(session.frame_counter(), failed_at.len() as u64);
        assert_eq!(session.diagnostics().failed_cycles, failed_at.len() as u64);
        assert_eq!(sink.commits(), 0);
    }

    #[test]
    fn boxed_source_drives_a_session() {
        let dest_ptrs = Arc::new(Mutex::new(Vec::new()));
        let source: Box<dyn FrameSource> = Box::new(RecordingSource {
            dest_ptrs: Arc::clone(&dest_ptrs),
        });
        let config = SessionConfig::new(8, 2, FrameRate::Fps30);
        let mut session = Session::start(source, fixed_timeout(500), config).unwrap();
        let mut sink = OutputImage::new();

        assert_eq!(run_cycle(&mut session, &mut sink), TickOutcome::Applied { frame: 1 });
        assert_eq!(&sink.rgba()[..4], &[5, 5, 5, 255]);
        assert_eq!(dest_ptrs.lock().len(), 1);
    }

    #[test]
    fn saved_read_only_controls_are_skipped() {
        let sdk = mock_sdk();
        let mut settings = hd720_settings();
        settings.controls.insert(ControlKind::Temperature, 300);
        settings.controls.insert(ControlKind::Gain, 90);

        let _session = Session::open_asi(Arc::clone(&sdk), &settings).unwrap();
        let id = CameraId(0);
        assert_eq!(sdk.control(id, ControlKind::Temperature), Some((0, false)));
        assert_eq!(sdk.control(id, ControlKind::Gain), Some((90, false)));
    }

    #[test]
    fn terminate_is_idempotent_and_releases_once() {
        let sdk = mock_sdk();
        let mut session = Session::open_asi(Arc::clone(&sdk), &hd720_settings()).unwrap();
        let mut sink = OutputImage::new();
        run_cycle(&mut session, &mut sink);

        assert!(session.terminate());
        assert!(!session.terminate());
        assert!(session.is_terminated());
        assert_eq!(session.buffer_sizes(), Some((0, 0)));
        assert_eq!(sdk.close_count(CameraId(0)), 1);
        assert!(!sdk.is_video_active(CameraId(0)));

        assert_eq!(session.tick(Duration::from_millis(100), &mut sink), TickOutcome::Terminated);
        assert!(!session.pause());
        assert!(!session.resume());
        assert_eq!(session.state(), UpdateState::Terminated);

        drop(session);
        assert_eq!(sdk.close_count(CameraId(0)), 1);
    }

    #[test]
    fn terminate_waits_for_in_flight_capture() {
        let sdk = mock_sdk();
        let mut session = Session::open_asi(Arc::clone(&sdk), &hd720_settings()).unwrap();
        let mut sink = OutputImage::new();

        sdk.hold_captures();
        session.tick(Duration::from_millis(42), &mut sink);
        assert!(sdk.wait_for_captures_started(1, TIMEOUT));

        let releaser = {
            let sdk = Arc::clone(&sdk);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                sdk.release_captures();
            })
        };

        assert!(session.terminate());
        releaser.join().unwrap();
        assert_eq!(sdk.captures_finished(), 1);
        assert_eq!(sdk.close_count(CameraId(0)), 1);
        assert_eq!(session.diagnostics().stranded_captures, 0);
        assert_eq!(sink.commits(), 0);
    }

    #[test]
    fn drop_terminates_session() {
        let sdk = mock_sdk();
        let session = Session::open_asi(Arc::clone(&sdk), &hd720_settings()).unwrap();
        assert!(sdk.is_open(CameraId(0)));
        drop(session);
        assert_eq!(sdk.close_count(CameraId(0)), 1);
        assert!(!sdk.is_open(CameraId(0)));
    }

    #[test]
    fn allocation_failure_is_a_resource_error() {
        let dest_ptrs = Arc::new(Mutex::new(Vec::new()));
        let source = RecordingSource {
            dest_ptrs: Arc::clone(&dest_ptrs),
        };
        let config = SessionConfig::new(u32::MAX, 1 << 30, FrameRate::Fps24);

        let result = Session::start(source, fixed_timeout(500), config);
        assert!(matches!(result, Err(CameraError::Resource(_))));
        // The source was dropped, never handed to a worker.
        assert_eq!(Arc::strong_count(&dest_ptrs), 1);
    }

    #[test]
    fn oversized_resolution_fails_before_any_capture() {
        let sdk = Arc::new(MockAsiSdk::new().with_camera("ZWO ASI120MC-S", 1280, 960));
        let settings = SessionSettings {
            resolution: Resolution::Hd1080,
            ..SessionSettings::default()
        };
        assert!(matches!(
            Session::open_asi(Arc::clone(&sdk), &settings),
            Err(CameraError::InvalidConfig(_))
        ));
        assert_eq!(sdk.captures_started(), 0);
        assert!(!sdk.is_open(CameraId(0)));
    }

    #[test]
    fn session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Session<AsiCamera<MockAsiSdk>>>();
    }
}
