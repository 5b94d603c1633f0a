// src/pipeline/orchestrator.rs
//
// Per-frame driver wiring the association engine, lifecycle registry,
// trigger zone, model seams, label resolution, smoothing and the result
// cache into one pass. Single-threaded by construction; only the cache
// handle is shared out.

use crate::bytetrack::ByteTracker;
use crate::cache::{CacheStats, ClassificationCache};
use crate::geometry::expand_bbox;
use crate::labels::{LabelCategory, LabelResolver};
use crate::lifecycle::{RegistryStatistics, TrackRegistry, TrackedObject};
use crate::models::{Detector, FeatureExtractor, ProbabilityEnsemble};
use crate::pipeline::metrics::PipelineMetrics;
use crate::smoother::TemporalSmoother;
use crate::trigger_zone::{TriggerZone, TriggerZoneSpec};
use crate::types::{Config, Detection, Frame};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const FPS_HISTORY_LEN: usize = 30;

/// Per-frame counters returned alongside the visible objects.
#[derive(Debug, Clone, Serialize)]
pub struct FrameStats {
    pub frame_count: u64,
    pub active_tracks: usize,
    pub total_tracks: usize,
    pub classifications: u64,
    pub cache_size: usize,
    pub fps: f64,
    pub avg_fps: f64,
    pub frame_time_ms: f64,
}

/// Everything a caller needs to render or log one processed frame.
#[derive(Debug)]
pub struct FrameReport {
    pub objects: Vec<TrackedObject>,
    pub stats: FrameStats,
}

/// Cumulative run statistics, serializable for end-of-run reporting.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatistics {
    pub frame_count: u64,
    pub classification_count: u64,
    /// Share of frames that did not need a classification pass.
    pub reduction_percentage: f64,
    pub avg_fps: f64,
    pub tracker: RegistryStatistics,
    pub cache: CacheStats,
}

pub struct PipelineOrchestrator<D, E, P>
where
    D: Detector,
    E: FeatureExtractor,
    P: ProbabilityEnsemble,
{
    detector: D,
    extractor: E,
    ensemble: P,

    tracker: ByteTracker,
    registry: TrackRegistry,
    zone: TriggerZone,
    resolver: LabelResolver,
    cache: Arc<ClassificationCache>,
    smoother: Option<TemporalSmoother>,
    metrics: PipelineMetrics,

    expand_bbox_ratio: f32,
    skip_frames: u64,
    frame_width: u32,
    frame_height: u32,

    frame_count: u64,
    classification_count: u64,
    last_detections: Vec<Detection>,
    fps_history: VecDeque<f64>,
    show_trigger_zone: bool,
}

impl<D, E, P> PipelineOrchestrator<D, E, P>
where
    D: Detector,
    E: FeatureExtractor,
    P: ProbabilityEnsemble,
{
    pub fn new(
        config: &Config,
        detector: D,
        extractor: E,
        ensemble: P,
        categories: Vec<LabelCategory>,
    ) -> Self {
        let smoother = if config.classification.enable_temporal_smoothing {
            Some(TemporalSmoother::new(
                config.classification.temporal_window_size,
            ))
        } else {
            None
        };

        info!(
            "Pipeline ready: {}x{} frames, zone {:?}, smoothing {}",
            config.video.frame_width,
            config.video.frame_height,
            config.trigger_zone,
            smoother.is_some()
        );

        Self {
            detector,
            extractor,
            ensemble,
            tracker: ByteTracker::new(
                config.tracking.track_thresh,
                config.tracking.track_buffer,
                config.tracking.match_thresh,
            ),
            registry: TrackRegistry::new(
                config.tracking.max_age,
                config.tracking.max_classification_attempts,
                config.tracking.max_tracks,
            ),
            zone: TriggerZone::new(
                config.video.frame_width,
                config.video.frame_height,
                config.trigger_zone,
            ),
            resolver: LabelResolver::new(categories, config.classification.confidence_threshold),
            cache: Arc::new(ClassificationCache::new(config.cache.max_size)),
            smoother,
            metrics: PipelineMetrics::new(),
            expand_bbox_ratio: config.classification.expand_bbox_ratio,
            skip_frames: config.classification.skip_frames,
            frame_width: config.video.frame_width,
            frame_height: config.video.frame_height,
            frame_count: 0,
            classification_count: 0,
            last_detections: Vec::new(),
            fps_history: VecDeque::with_capacity(FPS_HISTORY_LEN),
            show_trigger_zone: true,
        }
    }

    /// Run the full per-frame pass: detect (or reuse), associate, update
    /// lifecycles, classify objects gated by the trigger zone.
    pub fn process_frame(&mut self, frame: &Frame) -> FrameReport {
        let started = Instant::now();
        self.frame_count += 1;
        self.metrics.inc(&self.metrics.total_frames);

        let detections = self.current_detections(frame);
        let raw_tracks = self.tracker.update(&detections);
        let update = self.registry.update(&raw_tracks);

        // Dropped identities take their smoothing windows with them. Cache
        // entries stay; a re-entering object may still hit.
        if let Some(smoother) = self.smoother.as_mut() {
            for id in &update.removed {
                smoother.clear_track(*id);
            }
        }

        let classify_started = Instant::now();
        for obj in &update.active {
            let id = obj.track_id();
            if !self.registry.should_classify(id) {
                continue;
            }
            let (cx, cy) = obj.center();
            if !self.zone.contains(cx, cy) {
                continue;
            }
            self.classify_object(frame, id, obj.bbox());
        }
        self.metrics.set_timing(
            &self.metrics.classify_time_us,
            classify_started.elapsed().as_micros() as u64,
        );

        // Re-read the objects so the report reflects this frame's state
        // transitions.
        let objects: Vec<TrackedObject> = update
            .active
            .iter()
            .filter_map(|o| self.registry.get(o.track_id()).cloned())
            .collect();

        let frame_time = started.elapsed().as_secs_f64();
        let fps = if frame_time > 0.0 { 1.0 / frame_time } else { 0.0 };
        if self.fps_history.len() >= FPS_HISTORY_LEN {
            self.fps_history.pop_front();
        }
        self.fps_history.push_back(fps);

        let registry_stats = self.registry.statistics();
        FrameReport {
            stats: FrameStats {
                frame_count: self.frame_count,
                active_tracks: objects.len(),
                total_tracks: registry_stats.total_tracks,
                classifications: self.classification_count,
                cache_size: self.cache.len(),
                fps,
                avg_fps: self.avg_fps(),
                frame_time_ms: frame_time * 1000.0,
            },
            objects,
        }
    }

    /// Fresh detections on schedule frames, otherwise the last result.
    fn current_detections(&mut self, frame: &Frame) -> Vec<Detection> {
        let run_detector =
            self.skip_frames == 0 || (self.frame_count - 1) % (self.skip_frames + 1) == 0;

        if run_detector {
            let started = Instant::now();
            let detections = self.detector.detect(frame);
            self.metrics.set_timing(
                &self.metrics.detect_time_us,
                started.elapsed().as_micros() as u64,
            );
            self.metrics.inc(&self.metrics.detector_runs);
            self.last_detections = detections;
        } else {
            self.metrics.inc(&self.metrics.detections_reused);
        }
        self.last_detections.clone()
    }

    /// One classification attempt. Any model error counts against the
    /// object's attempt budget instead of aborting the frame.
    fn classify_object(&mut self, frame: &Frame, track_id: u64, bbox: [f32; 4]) {
        let crop = expand_bbox(
            &bbox,
            self.expand_bbox_ratio,
            self.frame_width as f32,
            self.frame_height as f32,
        );

        let outcome = self
            .extractor
            .embed(frame, crop)
            .and_then(|features| self.ensemble.infer(&features));

        match outcome {
            Ok(probabilities) => {
                let mut results = self.resolver.resolve(&probabilities);
                if let Some(smoother) = self.smoother.as_mut() {
                    results = smoother.smooth(track_id, results);
                }

                if self.registry.mark_classified(track_id, results.clone()) {
                    self.cache.put(track_id, &results);
                    self.classification_count += 1;
                    self.metrics.inc(&self.metrics.classification_successes);
                    debug!("Object {} classified: {:?}", track_id, results);
                }
            }
            Err(e) => {
                warn!("Classification attempt failed for object {}: {}", track_id, e);
                self.registry.increment_attempts(track_id);
                self.metrics.inc(&self.metrics.classification_failures);
            }
        }
    }

    fn avg_fps(&self) -> f64 {
        if self.fps_history.is_empty() {
            return 0.0;
        }
        self.fps_history.iter().sum::<f64>() / self.fps_history.len() as f64
    }

    pub fn get_statistics(&self) -> PipelineStatistics {
        let reduction = if self.frame_count > 0 {
            (1.0 - self.classification_count as f64 / self.frame_count as f64) * 100.0
        } else {
            0.0
        };

        PipelineStatistics {
            frame_count: self.frame_count,
            classification_count: self.classification_count,
            reduction_percentage: reduction,
            avg_fps: self.avg_fps(),
            tracker: self.registry.statistics(),
            cache: self.cache.stats(),
        }
    }

    /// Back to the post-construction state. Identity numbering restarts.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.registry.reset();
        self.cache.clear();
        self.cache.reset_stats();
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.clear_all();
        }
        self.metrics.reset();
        self.frame_count = 0;
        self.classification_count = 0;
        self.last_detections.clear();
        self.fps_history.clear();
        info!("Pipeline reset");
    }

    pub fn update_trigger_zone(&mut self, spec: TriggerZoneSpec) {
        self.zone.update_spec(spec);
        info!("Trigger zone updated to {:?}", self.zone.spec());
    }

    pub fn trigger_zone(&self) -> &TriggerZone {
        &self.zone
    }

    pub fn toggle_trigger_zone_visibility(&mut self) -> bool {
        self.show_trigger_zone = !self.show_trigger_zone;
        self.show_trigger_zone
    }

    pub fn set_trigger_zone_visibility(&mut self, visible: bool) {
        self.show_trigger_zone = visible;
    }

    pub fn trigger_zone_visible(&self) -> bool {
        self.show_trigger_zone
    }

    /// Shared handle for display or reporting threads.
    pub fn cache(&self) -> Arc<ClassificationCache> {
        Arc::clone(&self.cache)
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}
