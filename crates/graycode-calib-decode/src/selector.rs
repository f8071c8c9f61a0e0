//! Error histogram, adaptive threshold and point-pair emission.

use crate::bitplane::{PixelState, ERROR_UNRESOLVED};
use crate::{Mask, ProjectorSize};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Pixel counts per error level `0..ERROR_UNRESOLVED`.
///
/// Unresolved pixels are not counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorHistogram {
    pub counts: [usize; ERROR_UNRESOLVED as usize],
}

impl ErrorHistogram {
    /// Count in-mask pixels by error level.
    pub fn from_states(states: &[PixelState], mask: &Mask) -> Self {
        let mut counts = [0usize; ERROR_UNRESOLVED as usize];
        for (idx, s) in states.iter().enumerate() {
            if mask.contains_index(idx) && s.is_resolved() {
                counts[s.error as usize] += 1;
            }
        }
        Self { counts }
    }

    /// Pixels with error level `<= level`.
    pub fn cumulative(&self, level: u8) -> usize {
        let end = (level as usize + 1).min(self.counts.len());
        self.counts[..end].iter().sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Smallest error level whose cumulative count reaches `min_point_count`.
    ///
    /// Falls back to the loosest resolved level when no level qualifies, so
    /// the caller always gets the best available points.
    pub fn select_threshold(&self, min_point_count: usize) -> u8 {
        let mut cumulative = 0usize;
        for (level, &n) in self.counts.iter().enumerate() {
            cumulative += n;
            if cumulative >= min_point_count {
                return level as u8;
            }
        }
        ERROR_UNRESOLVED - 1
    }
}

/// One camera pixel and the projector pixel it sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointPair {
    pub camera: Point2<u32>,
    pub projector: Point2<u32>,
}

/// Accepted correspondences as two parallel sequences.
///
/// Index `i` of `camera_points` and `projector_points` refer to the same
/// pair. Pairs are in camera raster order and are not deduplicated: several
/// camera pixels may map to one projector pixel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correspondences {
    pub camera_points: Vec<Point2<u32>>,
    pub projector_points: Vec<Point2<u32>>,
    pub histogram: ErrorHistogram,
    /// Highest error level that was accepted.
    pub error_threshold: u8,
}

impl Correspondences {
    #[inline]
    pub fn len(&self) -> usize {
        self.camera_points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.camera_points.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = PointPair> + '_ {
        self.camera_points
            .iter()
            .zip(&self.projector_points)
            .map(|(&camera, &projector)| PointPair { camera, projector })
    }

    fn push(&mut self, camera: Point2<u32>, projector: Point2<u32>) {
        self.camera_points.push(camera);
        self.projector_points.push(projector);
    }
}

/// Emit every in-mask pixel with `error <= threshold` whose decoded
/// coordinate lies on the projector grid, in raster order (y outer, x inner).
pub fn select_pairs(
    states: &[PixelState],
    mask: &Mask,
    projector: ProjectorSize,
    threshold: u8,
    histogram: ErrorHistogram,
) -> Correspondences {
    let capacity = histogram.cumulative(threshold);
    let mut out = Correspondences {
        camera_points: Vec::with_capacity(capacity),
        projector_points: Vec::with_capacity(capacity),
        histogram,
        error_threshold: threshold,
    };

    let width = mask.width();
    for (y, row) in states.chunks_exact(width.max(1)).enumerate() {
        for (x, s) in row.iter().enumerate() {
            if !mask.contains_index(y * width + x) || s.error > threshold || !s.is_resolved() {
                continue;
            }
            let (px, py) = s.coordinate();
            let (px, py) = (px as u32, py as u32);
            if !projector.contains(px, py) {
                continue;
            }
            out.push(Point2::new(x as u32, y as u32), Point2::new(px, py));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitplane::AxisState;

    fn state(x: u16, y: u16, error: u8) -> PixelState {
        PixelState {
            column: AxisState {
                value: x,
                parity: false,
            },
            row: AxisState {
                value: y,
                parity: false,
            },
            error,
        }
    }

    #[test]
    fn threshold_is_smallest_level_meeting_minimum() {
        let h = ErrorHistogram {
            counts: [5, 3, 10, 2],
        };
        assert_eq!(h.select_threshold(1), 0);
        assert_eq!(h.select_threshold(5), 0);
        assert_eq!(h.select_threshold(6), 1);
        assert_eq!(h.select_threshold(8), 1);
        assert_eq!(h.select_threshold(9), 2);
        assert_eq!(h.select_threshold(20), 3);
        assert_eq!(h.select_threshold(1000), 3);
    }

    #[test]
    fn threshold_is_monotonic_in_minimum() {
        let h = ErrorHistogram {
            counts: [0, 7, 0, 4],
        };
        let mut last = 0;
        for min in 1..20 {
            let t = h.select_threshold(min);
            assert!(t >= last, "threshold decreased at min={min}");
            last = t;
        }
    }

    #[test]
    fn empty_histogram_selects_loosest_level() {
        let h = ErrorHistogram::default();
        assert_eq!(h.select_threshold(10), ERROR_UNRESOLVED - 1);
    }

    #[test]
    fn histogram_skips_unresolved_and_masked_pixels() {
        let states = [
            state(0, 0, 0),
            state(0, 0, 2),
            state(0, 0, ERROR_UNRESOLVED),
            state(0, 0, 1),
        ];
        let mask = Mask::from_fn(4, 1, |x, _| x != 3);
        let h = ErrorHistogram::from_states(&states, &mask);
        assert_eq!(h.counts, [1, 0, 1, 0]);
        assert_eq!(h.cumulative(1), 1);
        assert_eq!(h.cumulative(3), 2);
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn pairs_respect_bounds_threshold_and_raster_order() {
        // 3x2 camera, 4x4 projector
        let states = [
            state(1, 2, 0),
            state(4, 0, 0), // x out of range
            state(3, 3, 2), // error above threshold
            state(0, 3, 1),
            state(2, 4, 0), // y out of range
            state(3, 0, 0),
        ];
        let mask = Mask::full(3, 2);
        let h = ErrorHistogram::from_states(&states, &mask);
        let pairs = select_pairs(&states, &mask, ProjectorSize::new(4, 4), 1, h);

        assert_eq!(pairs.camera_points.len(), pairs.projector_points.len());
        let got: Vec<_> = pairs
            .pairs()
            .map(|p| ((p.camera.x, p.camera.y), (p.projector.x, p.projector.y)))
            .collect();
        assert_eq!(
            got,
            vec![((0, 0), (1, 2)), ((0, 1), (0, 3)), ((2, 1), (3, 0))]
        );
        assert_eq!(pairs.error_threshold, 1);
    }

    #[test]
    fn masked_pixels_are_never_emitted() {
        let states = [state(0, 0, 0), state(1, 0, 0)];
        let mask = Mask::from_fn(2, 1, |x, _| x == 1);
        let h = ErrorHistogram::from_states(&states, &mask);
        let pairs = select_pairs(&states, &mask, ProjectorSize::new(2, 1), 0, h);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs.camera_points[0], Point2::new(1, 0));
    }
}
