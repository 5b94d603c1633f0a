// src/geometry.rs
//
// Rectangle math shared by the tracker and the classification path:
// IoU, the greedy cost-threshold matcher, and bbox expansion.

/// Intersection-over-union of two [x1, y1, x2, y2] rectangles.
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Cost matrix `1 - IoU` between two sets of rectangles, rows = `a`.
pub fn iou_cost_matrix(a: &[[f32; 4]], b: &[[f32; 4]]) -> Vec<Vec<f32>> {
    a.iter()
        .map(|ra| b.iter().map(|rb| 1.0 - iou(ra, rb)).collect())
        .collect()
}

#[derive(Debug, Default)]
pub struct Assignment {
    /// (row, col) pairs accepted by the matcher.
    pub matches: Vec<(usize, usize)>,
    pub unmatched_rows: Vec<usize>,
    pub unmatched_cols: Vec<usize>,
}

/// Greedy bipartite matching under a cost ceiling.
///
/// Repeatedly accepts the globally smallest remaining cost until it exceeds
/// `thresh`, removing the matched row and column each time. Ties go to the
/// first minimum in row-major scan order, which keeps the result
/// deterministic. O(n^2 * min(n, m)), fine at tens of objects per frame.
pub fn greedy_assignment(cost: &[Vec<f32>], thresh: f32) -> Assignment {
    let n_rows = cost.len();
    let n_cols = cost.first().map_or(0, |r| r.len());

    let mut result = Assignment::default();
    if n_rows == 0 || n_cols == 0 {
        result.unmatched_rows = (0..n_rows).collect();
        result.unmatched_cols = (0..n_cols).collect();
        return result;
    }

    let mut free_rows: Vec<usize> = (0..n_rows).collect();
    let mut free_cols: Vec<usize> = (0..n_cols).collect();

    loop {
        let mut best: Option<(usize, usize, f32)> = None;
        for (ri, &row) in free_rows.iter().enumerate() {
            for (ci, &col) in free_cols.iter().enumerate() {
                let c = cost[row][col];
                if best.map_or(true, |(_, _, b)| c < b) {
                    best = Some((ri, ci, c));
                }
            }
        }

        match best {
            Some((ri, ci, c)) if c <= thresh => {
                let row = free_rows.remove(ri);
                let col = free_cols.remove(ci);
                result.matches.push((row, col));
            }
            _ => break,
        }
    }

    result.unmatched_rows = free_rows;
    result.unmatched_cols = free_cols;
    result
}

/// Center point of an [x1, y1, x2, y2] rectangle.
pub fn bbox_center(bbox: &[f32; 4]) -> (f32, f32) {
    ((bbox[0] + bbox[2]) / 2.0, (bbox[1] + bbox[3]) / 2.0)
}

/// Grow a bbox by `ratio` on every side, clamped to the frame. Gives the
/// feature extractor some context around a tight detection box.
pub fn expand_bbox(bbox: &[f32; 4], ratio: f32, frame_w: f32, frame_h: f32) -> [f32; 4] {
    if ratio <= 0.0 {
        return *bbox;
    }
    let w = bbox[2] - bbox[0];
    let h = bbox[3] - bbox[1];
    let dx = w * ratio;
    let dy = h * ratio;

    [
        (bbox[0] - dx).max(0.0),
        (bbox[1] - dy).max(0.0),
        (bbox[2] + dx).min(frame_w),
        (bbox[3] + dy).min(frame_h),
    ]
}
