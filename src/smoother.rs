// src/smoother.rs
//
// Temporal smoother for per-object classification results. Raw results
// flicker from frame to frame; the true labels are stable over a short
// window, so a sliding-window majority vote per attribute removes most of
// the noise.

use crate::lifecycle::LabelResults;
use std::collections::{HashMap, VecDeque};

pub struct TemporalSmoother {
    window_size: usize,
    history: HashMap<u64, VecDeque<LabelResults>>,
}

impl TemporalSmoother {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            history: HashMap::new(),
        }
    }

    /// Append `current` to the object's window and return the majority
    /// vote. With fewer than two entries the current result passes
    /// through unchanged.
    pub fn smooth(&mut self, track_id: u64, current: LabelResults) -> LabelResults {
        let window = self.history.entry(track_id).or_default();

        window.push_back(current.clone());
        while window.len() > self.window_size {
            window.pop_front();
        }

        if window.len() < 2 {
            return current;
        }

        Self::vote(window)
    }

    /// Majority vote over the attributes of the oldest entry. Ties go to
    /// the value first encountered in window order.
    fn vote(window: &VecDeque<LabelResults>) -> LabelResults {
        let mut result = LabelResults::new();
        let oldest = match window.front() {
            Some(entry) => entry,
            None => return result,
        };

        for key in oldest.keys() {
            // (value, count) pairs in first-encounter order.
            let mut counts: Vec<(&String, usize)> = Vec::new();
            for entry in window {
                if let Some(value) = entry.get(key) {
                    match counts.iter_mut().find(|(v, _)| *v == value) {
                        Some((_, n)) => *n += 1,
                        None => counts.push((value, 1)),
                    }
                }
            }

            let mut winner: Option<(&String, usize)> = None;
            for (value, count) in counts {
                if winner.map_or(true, |(_, best)| count > best) {
                    winner = Some((value, count));
                }
            }

            if let Some((value, _)) = winner {
                result.insert(key.clone(), value.clone());
            }
        }

        result
    }

    pub fn clear_track(&mut self, track_id: u64) {
        self.history.remove(&track_id);
    }

    pub fn clear_all(&mut self) {
        self.history.clear();
    }

    pub fn history_len(&self, track_id: u64) -> usize {
        self.history.get(&track_id).map_or(0, |w| w.len())
    }

    pub fn tracked_count(&self) -> usize {
        self.history.len()
    }
}
