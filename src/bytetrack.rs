// src/bytetrack.rs
//
// ByteTrack-style association engine. Matches per-frame detections against
// persistent tracks in three stages: confirmed tracks vs high-confidence
// detections, then leftovers vs low-confidence detections (second chance
// for partially occluded objects), then unconfirmed tracks vs the
// detections left over from stage one. Identities are strictly increasing
// per tracker instance and are never recycled.

use crate::geometry::{greedy_assignment, iou_cost_matrix, Assignment};
use crate::types::Detection;
use tracing::debug;

/// Detections at or below this score are discarded outright.
const LOW_SCORE_FLOOR: f32 = 0.1;

/// A persistent track identity owned by the tracker.
#[derive(Debug, Clone)]
pub struct RawTrack {
    bbox: [f32; 4],
    score: f32,
    track_id: u64,
    is_activated: bool,
    tracklet_len: u32,
    /// Frame of the last successful match.
    frame_id: u64,
    start_frame_id: u64,
}

impl RawTrack {
    fn new(detection: &Detection, track_id: u64, frame_id: u64) -> Self {
        Self {
            bbox: detection.bbox,
            score: detection.confidence,
            track_id,
            is_activated: true,
            tracklet_len: 0,
            frame_id,
            start_frame_id: frame_id,
        }
    }

    fn update(&mut self, detection: &Detection, frame_id: u64) {
        self.bbox = detection.bbox;
        self.score = detection.confidence;
        self.tracklet_len += 1;
        self.frame_id = frame_id;
        self.is_activated = true;
    }

    fn mark_lost(&mut self) {
        self.is_activated = false;
    }

    pub fn bbox(&self) -> [f32; 4] {
        self.bbox
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    pub fn is_activated(&self) -> bool {
        self.is_activated
    }

    pub fn tracklet_len(&self) -> u32 {
        self.tracklet_len
    }

    pub fn last_frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn start_frame_id(&self) -> u64 {
        self.start_frame_id
    }
}

pub struct ByteTracker {
    track_thresh: f32,
    track_buffer: u64,
    match_thresh: f32,

    frame_id: u64,
    next_track_id: u64,

    tracked: Vec<RawTrack>,
    lost: Vec<RawTrack>,
}

impl ByteTracker {
    pub fn new(track_thresh: f32, track_buffer: u64, match_thresh: f32) -> Self {
        Self {
            track_thresh,
            track_buffer,
            match_thresh,
            frame_id: 0,
            next_track_id: 0,
            tracked: Vec::new(),
            lost: Vec::new(),
        }
    }

    /// Advance one frame and return the tracks active this frame.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<RawTrack> {
        self.frame_id += 1;

        // Zero detections: everything currently tracked goes lost.
        if detections.is_empty() {
            for mut track in self.tracked.drain(..) {
                track.mark_lost();
                self.lost.push(track);
            }
            self.purge_expired_lost();
            return Vec::new();
        }

        let mut high: Vec<Detection> = Vec::new();
        let mut low: Vec<Detection> = Vec::new();
        for det in detections {
            if det.confidence > self.track_thresh {
                high.push(det.clone());
            } else if det.confidence > LOW_SCORE_FLOOR {
                low.push(det.clone());
            }
        }

        let (confirmed, unconfirmed): (Vec<RawTrack>, Vec<RawTrack>) =
            self.tracked.drain(..).partition(|t| t.is_activated());

        let mut confirmed: Vec<Option<RawTrack>> = confirmed.into_iter().map(Some).collect();
        let mut unconfirmed: Vec<Option<RawTrack>> = unconfirmed.into_iter().map(Some).collect();

        let cost_thresh = 1.0 - self.match_thresh;
        let mut active: Vec<RawTrack> = Vec::new();

        // Stage A: confirmed tracks vs high-confidence detections.
        let stage_a = {
            let track_boxes: Vec<[f32; 4]> = confirmed
                .iter()
                .map(|t| t.as_ref().map(|t| t.bbox).unwrap_or_default())
                .collect();
            let det_boxes: Vec<[f32; 4]> = high.iter().map(|d| d.bbox).collect();
            Self::assign(&track_boxes, &det_boxes, cost_thresh)
        };
        for &(ti, di) in &stage_a.matches {
            if let Some(mut track) = confirmed[ti].take() {
                track.update(&high[di], self.frame_id);
                active.push(track);
            }
        }

        // Stage B: leftover confirmed tracks vs low-confidence detections.
        let mut remaining: Vec<Option<RawTrack>> = stage_a
            .unmatched_rows
            .iter()
            .map(|&ti| confirmed[ti].take())
            .collect();
        let stage_b = {
            let track_boxes: Vec<[f32; 4]> = remaining
                .iter()
                .map(|t| t.as_ref().map(|t| t.bbox).unwrap_or_default())
                .collect();
            let det_boxes: Vec<[f32; 4]> = low.iter().map(|d| d.bbox).collect();
            Self::assign(&track_boxes, &det_boxes, cost_thresh)
        };
        for &(ti, di) in &stage_b.matches {
            if let Some(mut track) = remaining[ti].take() {
                track.update(&low[di], self.frame_id);
                active.push(track);
            }
        }
        for &ti in &stage_b.unmatched_rows {
            if let Some(mut track) = remaining[ti].take() {
                track.mark_lost();
                debug!("Track {} lost at frame {}", track.track_id(), self.frame_id);
                self.lost.push(track);
            }
        }

        // Stage C: unconfirmed tracks vs detections left over from stage A.
        // Low-confidence detections are deliberately not offered here.
        let dets_left: Vec<Detection> = stage_a
            .unmatched_cols
            .iter()
            .map(|&di| high[di].clone())
            .collect();
        let stage_c = {
            let track_boxes: Vec<[f32; 4]> = unconfirmed
                .iter()
                .map(|t| t.as_ref().map(|t| t.bbox).unwrap_or_default())
                .collect();
            let det_boxes: Vec<[f32; 4]> = dets_left.iter().map(|d| d.bbox).collect();
            Self::assign(&track_boxes, &det_boxes, cost_thresh)
        };
        for &(ti, di) in &stage_c.matches {
            if let Some(mut track) = unconfirmed[ti].take() {
                track.update(&dets_left[di], self.frame_id);
                active.push(track);
            }
        }
        // Unmatched unconfirmed tracks are discarded and never re-enter.

        // Remaining high-confidence detections spawn new tracks, activated
        // from their first frame.
        for &di in &stage_c.unmatched_cols {
            let det = &dets_left[di];
            if det.confidence < self.track_thresh {
                continue;
            }
            let id = self.next_id();
            debug!(
                "New track {} at frame {} (conf {:.2})",
                id, self.frame_id, det.confidence
            );
            active.push(RawTrack::new(det, id, self.frame_id));
        }

        self.purge_expired_lost();

        self.tracked = active.clone();
        active
    }

    /// One matching stage. An empty side yields no matches but still
    /// reports every row and column as unmatched.
    fn assign(track_boxes: &[[f32; 4]], det_boxes: &[[f32; 4]], cost_thresh: f32) -> Assignment {
        if track_boxes.is_empty() || det_boxes.is_empty() {
            return Assignment {
                matches: Vec::new(),
                unmatched_rows: (0..track_boxes.len()).collect(),
                unmatched_cols: (0..det_boxes.len()).collect(),
            };
        }
        greedy_assignment(&iou_cost_matrix(track_boxes, det_boxes), cost_thresh)
    }

    fn purge_expired_lost(&mut self) {
        let frame_id = self.frame_id;
        let buffer = self.track_buffer;
        self.lost.retain(|t| frame_id - t.last_frame_id() <= buffer);
    }

    fn next_id(&mut self) -> u64 {
        self.next_track_id += 1;
        self.next_track_id
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// Clear all track state and restart the identity sequence.
    pub fn reset(&mut self) {
        self.tracked.clear();
        self.lost.clear();
        self.frame_id = 0;
        self.next_track_id = 0;
    }
}
