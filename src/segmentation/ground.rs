use crate::{point::ScanPoint, utils::Real};

use super::RangeImage;

/// One flag per input point, set for returns on the ground.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundMask {
    flags: Vec<bool>,
}

impl GroundMask {
    #[inline]
    pub fn is_ground(&self, point: usize) -> bool {
        self.flags.get(point).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.flags.iter().filter(|&&flag| flag).count()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.flags.iter().copied()
    }
}

/// Marks ground returns from the slope between vertically adjacent rings.
///
/// Only the lowest `ground_rings` ring pairs of every column are inspected,
/// which assumes a roughly level sensor.
#[derive(Debug, Clone)]
pub struct GroundSegmenter<T> {
    ground_rings: usize,
    /// In radians.
    max_slope: T,
}

impl<T: Real> GroundSegmenter<T> {
    /// `max_slope` is in degrees.
    pub fn new(ground_rings: usize, max_slope: T) -> Self {
        Self {
            ground_rings,
            max_slope: max_slope.to_radians(),
        }
    }

    /// `points` is the scan `image` was projected from. Cells whose point is
    /// missing from it are skipped.
    pub fn mark_ground(&self, image: &RangeImage<T>, points: &[ScanPoint<T>]) -> GroundMask {
        let geometry = image.geometry();
        let mut flags = vec![false; points.len()];

        let pairs = self.ground_rings.min(geometry.rings.saturating_sub(1));
        for column in 0..geometry.columns {
            for ring in 0..pairs {
                let lower = geometry.grid_index(ring, column).and_then(|i| image.get(i));
                let upper = geometry.grid_index(ring + 1, column).and_then(|i| image.get(i));
                let (Some(lower), Some(upper)) = (lower, upper) else {
                    continue;
                };

                let (Some(upper_point), Some(lower_point)) =
                    (points.get(upper.point), points.get(lower.point))
                else {
                    continue;
                };
                let chord = upper_point.position - lower_point.position;
                let slope = chord.z.atan2(chord.x.hypot(chord.y));
                if slope.abs() <= self.max_slope {
                    flags[lower.point] = true;
                    flags[upper.point] = true;
                }
            }
        }

        GroundMask { flags }
    }
}
