// src/lifecycle.rs
//
// Classification-oriented lifecycle layered on top of raw tracks. Each
// identity moves NEW -> TRACKED -> CLASSIFIED, with FAILED reachable once
// the attempt budget is spent. CLASSIFIED and FAILED are terminal for
// classification; the object keeps being tracked spatially.

use crate::bytetrack::RawTrack;
use crate::geometry::bbox_center;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrackingState {
    New,
    Tracked,
    Classified,
    Failed,
}

impl TrackingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Tracked => "TRACKED",
            Self::Classified => "CLASSIFIED",
            Self::Failed => "FAILED",
        }
    }
}

/// Committed classification output: attribute name -> label.
pub type LabelResults = HashMap<String, String>;

/// One tracked object with lifecycle state. State only changes through
/// [`TrackRegistry`] methods; there is no public setter.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    track_id: u64,
    bbox: [f32; 4],
    confidence: f32,
    state: TrackingState,
    frames_since_update: u32,
    attempts: u32,
    results: Option<LabelResults>,
}

impl TrackedObject {
    fn new(raw: &RawTrack) -> Self {
        Self {
            track_id: raw.track_id(),
            bbox: raw.bbox(),
            confidence: raw.score(),
            state: TrackingState::New,
            frames_since_update: 0,
            attempts: 0,
            results: None,
        }
    }

    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    pub fn bbox(&self) -> [f32; 4] {
        self.bbox
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn frames_since_update(&self) -> u32 {
        self.frames_since_update
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn results(&self) -> Option<&LabelResults> {
        self.results.as_ref()
    }

    pub fn center(&self) -> (f32, f32) {
        bbox_center(&self.bbox)
    }

    pub fn area(&self) -> f32 {
        (self.bbox[2] - self.bbox[0]) * (self.bbox[3] - self.bbox[1])
    }
}

/// Per-state counts plus totals, snapshotted by `statistics()`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegistryStatistics {
    pub total_tracks: usize,
    pub active_tracks: usize,
    pub new_tracks: usize,
    pub tracked: usize,
    pub classified: usize,
    pub failed: usize,
    pub frame_count: u64,
}

/// Result of feeding one frame of raw tracks through the registry.
#[derive(Debug, Default)]
pub struct RegistryUpdate {
    /// Objects associated this frame, ready for trigger evaluation.
    pub active: Vec<TrackedObject>,
    /// Identities dropped this frame (aged out or evicted under capacity).
    pub removed: Vec<u64>,
}

pub struct TrackRegistry {
    objects: HashMap<u64, TrackedObject>,
    max_age: u32,
    max_attempts: u32,
    max_tracks: usize,
    frame_count: u64,
}

impl TrackRegistry {
    pub fn new(max_age: u32, max_attempts: u32, max_tracks: usize) -> Self {
        Self {
            objects: HashMap::new(),
            max_age,
            max_attempts,
            max_tracks,
            frame_count: 0,
        }
    }

    /// Absorb the association engine's output for one frame.
    pub fn update(&mut self, raw_tracks: &[RawTrack]) -> RegistryUpdate {
        self.frame_count += 1;

        let mut seen: HashSet<u64> = HashSet::with_capacity(raw_tracks.len());
        for raw in raw_tracks {
            let id = raw.track_id();
            seen.insert(id);

            match self.objects.get_mut(&id) {
                Some(obj) => {
                    obj.bbox = raw.bbox();
                    obj.confidence = raw.score();
                    obj.frames_since_update = 0;
                    if obj.state == TrackingState::New {
                        obj.state = TrackingState::Tracked;
                    }
                }
                None => {
                    debug!("Tracking new object {}", id);
                    self.objects.insert(id, TrackedObject::new(raw));
                }
            }
        }

        let mut removed = Vec::new();
        for (id, obj) in self.objects.iter_mut() {
            if !seen.contains(id) {
                obj.frames_since_update += 1;
                if obj.frames_since_update > self.max_age {
                    removed.push(*id);
                }
            }
        }
        for id in &removed {
            self.objects.remove(id);
            debug!("Object {} aged out", id);
        }

        removed.extend(self.enforce_capacity());

        let active = self
            .objects
            .values()
            .filter(|o| o.frames_since_update == 0)
            .cloned()
            .collect();

        RegistryUpdate { active, removed }
    }

    /// Keep the highest-confidence `max_tracks` objects, dropping the rest.
    fn enforce_capacity(&mut self) -> Vec<u64> {
        if self.objects.len() <= self.max_tracks {
            return Vec::new();
        }

        let mut by_confidence: Vec<(u64, f32)> = self
            .objects
            .iter()
            .map(|(id, o)| (*id, o.confidence))
            .collect();
        by_confidence
            .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let evicted: Vec<u64> = by_confidence[self.max_tracks..]
            .iter()
            .map(|(id, _)| *id)
            .collect();
        for id in &evicted {
            self.objects.remove(id);
        }
        debug!(
            "Capacity limit {} reached, evicted {} low-confidence objects",
            self.max_tracks,
            evicted.len()
        );
        evicted
    }

    pub fn get(&self, track_id: u64) -> Option<&TrackedObject> {
        self.objects.get(&track_id)
    }

    pub fn remove(&mut self, track_id: u64) -> bool {
        self.objects.remove(&track_id).is_some()
    }

    /// Commit a classification result. Only valid while the object still
    /// awaits classification.
    pub fn mark_classified(&mut self, track_id: u64, results: LabelResults) -> bool {
        match self.objects.get_mut(&track_id) {
            Some(obj)
                if obj.state == TrackingState::New || obj.state == TrackingState::Tracked =>
            {
                obj.state = TrackingState::Classified;
                obj.results = Some(results);
                true
            }
            _ => false,
        }
    }

    pub fn mark_failed(&mut self, track_id: u64) -> bool {
        match self.objects.get_mut(&track_id) {
            Some(obj)
                if obj.state == TrackingState::New || obj.state == TrackingState::Tracked =>
            {
                obj.state = TrackingState::Failed;
                true
            }
            _ => false,
        }
    }

    /// Count one failed attempt; the object flips to FAILED once the budget
    /// is exhausted.
    pub fn increment_attempts(&mut self, track_id: u64) -> bool {
        let max_attempts = self.max_attempts;
        match self.objects.get_mut(&track_id) {
            Some(obj) => {
                obj.attempts += 1;
                if obj.attempts >= max_attempts
                    && (obj.state == TrackingState::New || obj.state == TrackingState::Tracked)
                {
                    obj.state = TrackingState::Failed;
                    debug!(
                        "Object {} failed after {} attempts",
                        track_id, obj.attempts
                    );
                }
                true
            }
            None => false,
        }
    }

    /// True iff the object still awaits classification and has attempt
    /// budget left.
    pub fn should_classify(&self, track_id: u64) -> bool {
        match self.objects.get(&track_id) {
            Some(obj) => {
                matches!(obj.state, TrackingState::New | TrackingState::Tracked)
                    && obj.attempts < self.max_attempts
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.objects.clear();
        self.frame_count = 0;
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn statistics(&self) -> RegistryStatistics {
        let mut stats = RegistryStatistics {
            total_tracks: self.objects.len(),
            active_tracks: 0,
            new_tracks: 0,
            tracked: 0,
            classified: 0,
            failed: 0,
            frame_count: self.frame_count,
        };

        for obj in self.objects.values() {
            if obj.frames_since_update == 0 {
                stats.active_tracks += 1;
            }
            match obj.state {
                TrackingState::New => stats.new_tracks += 1,
                TrackingState::Tracked => stats.tracked += 1,
                TrackingState::Classified => stats.classified += 1,
                TrackingState::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytetrack::ByteTracker;
    use crate::types::Detection;

    fn raw_tracks(tracker: &mut ByteTracker, dets: &[([f32; 4], f32)]) -> Vec<RawTrack> {
        let dets: Vec<Detection> = dets
            .iter()
            .map(|(b, c)| Detection::new(*b, *c))
            .collect();
        tracker.update(&dets)
    }

    #[test]
    fn test_new_then_tracked() {
        let mut bt = ByteTracker::new(0.5, 30, 0.3);
        let mut registry = TrackRegistry::new(30, 2, 20);

        let out = registry.update(&raw_tracks(&mut bt, &[([10.0, 20.0, 30.0, 40.0], 0.9)]));
        assert_eq!(out.active[0].state(), TrackingState::New);

        let out = registry.update(&raw_tracks(&mut bt, &[([11.0, 21.0, 31.0, 41.0], 0.9)]));
        assert_eq!(out.active[0].state(), TrackingState::Tracked);
        assert_eq!(out.active[0].track_id(), 1);
        assert_eq!(out.active[0].area(), 400.0);
    }

    #[test]
    fn test_removed_after_max_age() {
        let mut bt = ByteTracker::new(0.5, 30, 0.3);
        let mut registry = TrackRegistry::new(2, 2, 20);

        registry.update(&raw_tracks(&mut bt, &[([10.0, 20.0, 30.0, 40.0], 0.9)]));
        registry.update(&raw_tracks(&mut bt, &[([11.0, 21.0, 31.0, 41.0], 0.9)]));

        // Three empty frames exceed max_age = 2.
        registry.update(&raw_tracks(&mut bt, &[]));
        assert_eq!(registry.get(1).unwrap().frames_since_update(), 1);
        registry.update(&raw_tracks(&mut bt, &[]));
        let out = registry.update(&raw_tracks(&mut bt, &[]));

        assert_eq!(out.removed, vec![1]);
        assert!(registry.get(1).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_attempts_cap_forces_failed() {
        let mut bt = ByteTracker::new(0.5, 30, 0.3);
        let mut registry = TrackRegistry::new(30, 2, 20);
        registry.update(&raw_tracks(&mut bt, &[([0.0, 0.0, 10.0, 10.0], 0.9)]));

        assert!(registry.should_classify(1));
        registry.increment_attempts(1);
        assert!(registry.should_classify(1));
        registry.increment_attempts(1);

        let obj = registry.get(1).unwrap();
        assert!(obj.attempts() >= 2);
        assert_eq!(obj.state(), TrackingState::Failed);
        assert!(!registry.should_classify(1));
    }

    #[test]
    fn test_classified_is_terminal() {
        let mut bt = ByteTracker::new(0.5, 30, 0.3);
        let mut registry = TrackRegistry::new(30, 2, 20);
        registry.update(&raw_tracks(&mut bt, &[([0.0, 0.0, 10.0, 10.0], 0.9)]));

        let mut results = LabelResults::new();
        results.insert("brand".to_string(), "Aqua".to_string());
        assert!(registry.mark_classified(1, results.clone()));
        assert!(!registry.should_classify(1));
        assert_eq!(registry.get(1).unwrap().results(), Some(&results));

        // Further transitions are rejected.
        assert!(!registry.mark_failed(1));
        assert!(!registry.mark_classified(1, LabelResults::new()));
    }

    #[test]
    fn test_capacity_keeps_highest_confidence() {
        let mut bt = ByteTracker::new(0.5, 30, 0.3);
        let mut registry = TrackRegistry::new(30, 2, 2);

        let out = registry.update(&raw_tracks(
            &mut bt,
            &[
                ([0.0, 0.0, 10.0, 10.0], 0.95),
                ([100.0, 0.0, 110.0, 10.0], 0.6),
                ([200.0, 0.0, 210.0, 10.0], 0.8),
            ],
        ));

        assert_eq!(registry.len(), 2);
        assert_eq!(out.removed.len(), 1);
        let confidences: Vec<f32> = [1u64, 2, 3]
            .iter()
            .filter_map(|id| registry.get(*id).map(|o| o.confidence()))
            .collect();
        assert!(confidences.contains(&0.95));
        assert!(confidences.contains(&0.8));
    }

    #[test]
    fn test_statistics_counts_states() {
        let mut bt = ByteTracker::new(0.5, 30, 0.3);
        let mut registry = TrackRegistry::new(30, 2, 20);
        registry.update(&raw_tracks(
            &mut bt,
            &[
                ([0.0, 0.0, 10.0, 10.0], 0.9),
                ([100.0, 0.0, 110.0, 10.0], 0.9),
            ],
        ));

        registry.mark_classified(1, LabelResults::new());
        let stats = registry.statistics();

        assert_eq!(stats.total_tracks, 2);
        assert_eq!(stats.classified, 1);
        assert_eq!(stats.new_tracks, 1);
        assert_eq!(stats.frame_count, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut bt = ByteTracker::new(0.5, 30, 0.3);
        let mut registry = TrackRegistry::new(30, 2, 20);
        registry.update(&raw_tracks(&mut bt, &[([0.0, 0.0, 10.0, 10.0], 0.9)]));

        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.statistics().frame_count, 0);
    }
}
