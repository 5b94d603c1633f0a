// src/models.rs
//
// Capability seams for the external model stack. The core never touches
// pixels or weights itself; it drives these traits and turns any error
// into an attempt increment on the tracked object.

use crate::types::{Detection, Frame};
use ndarray::Array1;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClassificationError {
    #[error("malformed crop region {bbox:?}")]
    MalformedCrop { bbox: [f32; 4] },
    #[error("feature extraction failed: {0}")]
    Extraction(String),
    #[error("ensemble inference failed: {0}")]
    Inference(String),
}

/// Object detector. Returns an empty list when nothing is found; never
/// fails into the core.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Vec<Detection>;
}

/// Embedding extractor over a crop of the frame.
pub trait FeatureExtractor {
    fn embed(&mut self, frame: &Frame, bbox: [f32; 4]) -> Result<Array1<f32>, ClassificationError>;
}

/// Per-label probability ensemble over an embedding.
pub trait ProbabilityEnsemble {
    fn infer(
        &mut self,
        features: &Array1<f32>,
    ) -> Result<HashMap<String, f32>, ClassificationError>;
}
