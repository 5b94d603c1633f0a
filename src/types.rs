use crate::trigger_zone::TriggerZoneSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub trigger_zone: TriggerZoneSpec,
    pub classification: ClassificationConfig,
    pub cache: CacheConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Confidence threshold separating high from low detections.
    pub track_thresh: f32,
    /// Frames a lost track is kept before it is purged.
    pub track_buffer: u64,
    /// Minimum IoU for a detection to match a track.
    pub match_thresh: f32,
    /// Frames without an association before a tracked object is dropped.
    pub max_age: u32,
    /// Hard ceiling on simultaneously tracked objects.
    pub max_tracks: usize,
    pub max_classification_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Minimum probability for the label-resolution fallback to commit.
    pub confidence_threshold: f32,
    /// How much to grow a bounding box before feature extraction.
    pub expand_bbox_ratio: f32,
    pub enable_temporal_smoothing: bool,
    pub temporal_window_size: usize,
    /// 0 = run the detector every frame, N = reuse detections for N frames.
    pub skip_frames: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub frame_width: u32,
    pub frame_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig {
                track_thresh: 0.5,
                track_buffer: 30,
                match_thresh: 0.3,
                max_age: 30,
                max_tracks: 20,
                max_classification_attempts: 2,
            },
            trigger_zone: TriggerZoneSpec::default(),
            classification: ClassificationConfig {
                confidence_threshold: 0.5,
                expand_bbox_ratio: 0.1,
                enable_temporal_smoothing: true,
                temporal_window_size: 5,
                skip_frames: 0,
            },
            cache: CacheConfig { max_size: 100 },
            video: VideoConfig {
                frame_width: 1280,
                frame_height: 720,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

/// One video frame handed to the pipeline. The pixel payload is opaque to
/// the core; only the injected detector and extractor look inside it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp: f64,
}

/// A single detector output, fresh every processed frame.
#[derive(Debug, Clone)]
pub struct Detection {
    /// [x1, y1, x2, y2] in frame pixels.
    pub bbox: [f32; 4],
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: [f32; 4], confidence: f32) -> Self {
        Self { bbox, confidence }
    }
}
