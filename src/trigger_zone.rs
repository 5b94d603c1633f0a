// src/trigger_zone.rs
//
// Rectangular region of the frame in which classification may be
// attempted. Specified in percentages of the frame so the same config
// works across resolutions; resolved to pixels once per spec change.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerZoneSpec {
    /// Offset from the left edge, percent of frame width. Valid: [0, 50].
    pub x_offset_pct: f32,
    /// Offset from the top edge, percent of frame height. Valid: [0, 50].
    pub y_offset_pct: f32,
    /// Zone width, percent of frame width. Valid: [20, 80].
    pub width_pct: f32,
    /// Zone height, percent of frame height. Valid: [20, 80].
    pub height_pct: f32,
}

impl Default for TriggerZoneSpec {
    fn default() -> Self {
        Self {
            x_offset_pct: 30.0,
            y_offset_pct: 20.0,
            width_pct: 40.0,
            height_pct: 60.0,
        }
    }
}

impl TriggerZoneSpec {
    pub fn is_valid(&self) -> bool {
        (0.0..=50.0).contains(&self.x_offset_pct)
            && (0.0..=50.0).contains(&self.y_offset_pct)
            && (20.0..=80.0).contains(&self.width_pct)
            && (20.0..=80.0).contains(&self.height_pct)
            && self.x_offset_pct + self.width_pct <= 100.0
            && self.y_offset_pct + self.height_pct <= 100.0
    }

    /// Nearest valid configuration. Offsets clamp first, then sizes shrink
    /// so offset + size stays within the frame.
    pub fn clamped(&self) -> Self {
        let x_offset = self.x_offset_pct.clamp(0.0, 50.0);
        let y_offset = self.y_offset_pct.clamp(0.0, 50.0);
        let mut width = self.width_pct.clamp(20.0, 80.0);
        let mut height = self.height_pct.clamp(20.0, 80.0);

        if x_offset + width > 100.0 {
            width = 100.0 - x_offset;
        }
        if y_offset + height > 100.0 {
            height = 100.0 - y_offset;
        }

        Self {
            x_offset_pct: x_offset,
            y_offset_pct: y_offset,
            width_pct: width,
            height_pct: height,
        }
    }
}

pub struct TriggerZone {
    frame_width: u32,
    frame_height: u32,
    spec: TriggerZoneSpec,
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

impl TriggerZone {
    /// An invalid spec is never fatal: it is clamped and surfaced as a
    /// warning.
    pub fn new(frame_width: u32, frame_height: u32, spec: TriggerZoneSpec) -> Self {
        let mut zone = Self {
            frame_width,
            frame_height,
            spec: TriggerZoneSpec::default(),
            x1: 0,
            y1: 0,
            x2: 0,
            y2: 0,
        };
        zone.update_spec(spec);
        zone
    }

    pub fn update_spec(&mut self, spec: TriggerZoneSpec) {
        let spec = if spec.is_valid() {
            spec
        } else {
            let clamped = spec.clamped();
            warn!(
                "Invalid trigger zone spec {:?}, clamped to {:?}",
                spec, clamped
            );
            clamped
        };
        self.spec = spec;
        self.resolve();
    }

    fn resolve(&mut self) {
        let w = self.frame_width as f32;
        let h = self.frame_height as f32;

        let x1 = (w * self.spec.x_offset_pct / 100.0) as u32;
        let y1 = (h * self.spec.y_offset_pct / 100.0) as u32;
        let x2 = (w * (self.spec.x_offset_pct + self.spec.width_pct) / 100.0) as u32;
        let y2 = (h * (self.spec.y_offset_pct + self.spec.height_pct) / 100.0) as u32;

        self.x1 = x1.min(self.frame_width);
        self.y1 = y1.min(self.frame_height);
        self.x2 = x2.min(self.frame_width);
        self.y2 = y2.min(self.frame_height);
    }

    pub fn spec(&self) -> TriggerZoneSpec {
        self.spec
    }

    /// Pixel rectangle (x1, y1, x2, y2), always inside the frame.
    pub fn boundaries(&self) -> (u32, u32, u32, u32) {
        (self.x1, self.y1, self.x2, self.y2)
    }

    /// Inclusive containment test.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x1 as f32 && x <= self.x2 as f32 && y >= self.y1 as f32 && y <= self.y2 as f32
    }

    pub fn center(&self) -> (u32, u32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    pub fn area(&self) -> u32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(x: f32, y: f32, w: f32, h: f32) -> TriggerZoneSpec {
        TriggerZoneSpec {
            x_offset_pct: x,
            y_offset_pct: y,
            width_pct: w,
            height_pct: h,
        }
    }

    #[test]
    fn test_resolved_rectangle_640x480() {
        let zone = TriggerZone::new(640, 480, spec(25.0, 20.0, 50.0, 60.0));
        assert_eq!(zone.boundaries(), (160, 96, 480, 384));
    }

    #[test]
    fn test_contains_inclusive_bounds() {
        let zone = TriggerZone::new(640, 480, spec(25.0, 20.0, 50.0, 60.0));

        assert!(zone.contains(320.0, 240.0));
        assert!(!zone.contains(0.0, 0.0));
        // Boundary points are inside.
        assert!(zone.contains(160.0, 96.0));
        assert!(zone.contains(480.0, 384.0));
        assert!(!zone.contains(481.0, 384.0));
    }

    #[test]
    fn test_invalid_spec_is_clamped_not_fatal() {
        let zone = TriggerZone::new(640, 480, spec(60.0, -5.0, 90.0, 10.0));
        let s = zone.spec();

        assert!(s.is_valid());
        assert_eq!(s.x_offset_pct, 50.0);
        assert_eq!(s.y_offset_pct, 0.0);
        // Width clamps to 80 first, then shrinks to fit: 100 - 50 = 50.
        assert_eq!(s.width_pct, 50.0);
        assert_eq!(s.height_pct, 20.0);
    }

    #[test]
    fn test_zone_never_exceeds_frame() {
        let zone = TriggerZone::new(320, 240, spec(50.0, 50.0, 80.0, 80.0));
        let (x1, y1, x2, y2) = zone.boundaries();
        assert!(x2 <= 320 && y2 <= 240);
        assert!(x1 <= x2 && y1 <= y2);
    }

    #[test]
    fn test_update_spec_re_resolves() {
        let mut zone = TriggerZone::new(640, 480, TriggerZoneSpec::default());
        zone.update_spec(spec(25.0, 20.0, 50.0, 60.0));
        assert_eq!(zone.boundaries(), (160, 96, 480, 384));
        assert_eq!(zone.center(), (320, 240));
        assert_eq!(zone.area(), 320 * 288);
    }

    #[test]
    fn test_default_spec_is_valid() {
        assert!(TriggerZoneSpec::default().is_valid());
    }
}
