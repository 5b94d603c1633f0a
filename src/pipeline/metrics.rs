// src/pipeline/metrics.rs
//
// Shared observability counters. Cheap atomics so a reporting thread can
// clone the handle and read while the orchestrator thread writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub detector_runs: Arc<AtomicU64>,
    pub detections_reused: Arc<AtomicU64>,
    pub classification_successes: Arc<AtomicU64>,
    pub classification_failures: Arc<AtomicU64>,
    pub detect_time_us: Arc<AtomicU64>,
    pub classify_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            detector_runs: Arc::new(AtomicU64::new(0)),
            detections_reused: Arc::new(AtomicU64::new(0)),
            classification_successes: Arc::new(AtomicU64::new(0)),
            classification_failures: Arc::new(AtomicU64::new(0)),
            detect_time_us: Arc::new(AtomicU64::new(0)),
            classify_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Zero every counter; uptime keeps running.
    pub fn reset(&self) {
        for counter in [
            &self.total_frames,
            &self.detector_runs,
            &self.detections_reused,
            &self.classification_successes,
            &self.classification_failures,
            &self.detect_time_us,
            &self.classify_time_us,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            detector_runs: self.detector_runs.load(Ordering::Relaxed),
            detections_reused: self.detections_reused.load(Ordering::Relaxed),
            classification_successes: self.classification_successes.load(Ordering::Relaxed),
            classification_failures: self.classification_failures.load(Ordering::Relaxed),
            last_detect_us: self.detect_time_us.load(Ordering::Relaxed),
            last_classify_us: self.classify_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub detector_runs: u64,
    pub detections_reused: u64,
    pub classification_successes: u64,
    pub classification_failures: u64,
    pub last_detect_us: u64,
    pub last_classify_us: u64,
    pub elapsed_secs: f64,
}
