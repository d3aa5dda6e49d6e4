use serde::Serialize;
use std::time::{Duration, Instant};

/// Collects diagnostic statistics for an acquisition session.
pub struct PipelineStats {
    frames_applied: u64,
    failed_cycles: u64,
    stranded_captures: u64,
    captures_completed: u64,
    total_bytes: u64,
    start_time: Instant,
    capture_latency_us: u64,
}

/// Snapshot of pipeline stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub fps: f64,
    pub frames_applied: u64,
    pub failed_cycles: u64,
    pub stranded_captures: u64,
    pub captures_completed: u64,
    pub failure_rate: f64,
    pub capture_latency_ms: f64,
    pub bandwidth_bps: u64,
}

impl PipelineStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            frames_applied: 0,
            failed_cycles: 0,
            stranded_captures: 0,
            captures_completed: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            capture_latency_us: 0,
        }
    }

    /// Record a capture the worker finished converting.
    pub fn record_capture(&mut self, bytes: usize, latency: Duration) {
        self.captures_completed += 1;
        self.total_bytes += bytes as u64;
        self.capture_latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
    }

    /// Record a frame the consumer committed to its sink.
    pub fn record_applied(&mut self) {
        self.frames_applied += 1;
    }

    /// Record a cycle that ended in a capture failure.
    pub fn record_failure(&mut self) {
        self.failed_cycles += 1;
    }

    /// Record a capture that finished while the pipeline was paused.
    pub fn record_stranded(&mut self) {
        self.stranded_captures += 1;
    }

    /// Applied frames per second since the stats were created or reset.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.frames_applied as f64 / elapsed
    }

    /// Failed cycles as a percentage of all cycles (0.0 - 100.0).
    pub fn failure_rate(&self) -> f64 {
        let total = self.frames_applied + self.failed_cycles;
        if total == 0 {
            return 0.0;
        }
        (self.failed_cycles as f64 / total as f64) * 100.0
    }

    /// Duration of the most recent capture in milliseconds.
    pub fn capture_latency_ms(&self) -> f64 {
        self.capture_latency_us as f64 / 1000.0
    }

    /// Captured bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            fps: self.fps(),
            frames_applied: self.frames_applied,
            failed_cycles: self.failed_cycles,
            stranded_captures: self.stranded_captures,
            captures_completed: self.captures_completed,
            failure_rate: self.failure_rate(),
            capture_latency_ms: self.capture_latency_ms(),
            bandwidth_bps: self.bandwidth_bps(),
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn initialises_with_zero_values() {
        let stats = PipelineStats::new();
        assert_eq!(stats.frames_applied, 0);
        assert_eq!(stats.failed_cycles, 0);
        assert_eq!(stats.stranded_captures, 0);
        assert_eq!(stats.total_bytes, 0);
    }

    #[test]
    fn record_capture_tracks_bytes_and_latency() {
        let mut stats = PipelineStats::new();
        stats.record_capture(2_764_800, Duration::from_micros(12_500));
        assert_eq!(stats.captures_completed, 1);
        assert_eq!(stats.total_bytes, 2_764_800);
        assert!((stats.capture_latency_ms() - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn failure_rate_returns_percentage() {
        let mut stats = PipelineStats::new();
        stats.record_applied();
        stats.record_applied();
        stats.record_failure();
        let rate = stats.failure_rate();
        assert!(
            (rate - 33.333).abs() < 1.0,
            "failure rate should be ~33%, got {rate}"
        );
    }

    #[test]
    fn failure_rate_zero_when_no_cycles() {
        assert_eq!(PipelineStats::new().failure_rate(), 0.0);
    }

    #[test]
    fn stranded_captures_do_not_count_as_cycles() {
        let mut stats = PipelineStats::new();
        stats.record_stranded();
        assert_eq!(stats.stranded_captures, 1);
        assert_eq!(stats.failure_rate(), 0.0);
        assert_eq!(stats.frames_applied, 0);
    }

    #[test]
    fn bandwidth_bps_tracks_bytes() {
        let mut stats = PipelineStats::new();
        stats.record_capture(10_000, Duration::ZERO);
        thread::sleep(Duration::from_millis(50));
        let bps = stats.bandwidth_bps();
        assert!(bps > 0, "bandwidth should be positive, got {bps}");
    }

    #[test]
    fn reset_clears_all_counters() {
        let mut stats = PipelineStats::new();
        stats.record_capture(1000, Duration::from_millis(1));
        stats.record_applied();
        stats.record_stranded();
        stats.reset();
        assert_eq!(stats.captures_completed, 0);
        assert_eq!(stats.frames_applied, 0);
        assert_eq!(stats.stranded_captures, 0);
        assert_eq!(stats.capture_latency_us, 0);
    }

    #[test]
    fn snapshot_serialises_to_camelcase() {
        let mut stats = PipelineStats::new();
        stats.record_applied();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["framesApplied"], 1);
        assert!(json["strandedCaptures"].is_number());
        assert!(json["captureLatencyMs"].is_number());
        assert!(json.get("frames_applied").is_none());
    }
}
