//! Curvature based edge and planar feature extraction.

use nalgebra::{Point3, Scalar, Vector3};
use simba::scalar::SupersetOf;

use crate::{
    point::{FeaturePoint, ScanPoint},
    utils::Real,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig<T> {
    /// Neighbours taken on each side of a point.
    pub window: usize,
    /// Exclusive bounds of the curvature of an edge point.
    pub edge_curvature: (T, T),
    /// Exclusive bounds of the curvature of a planar point.
    pub planar_curvature: (T, T),
}

impl<T: SupersetOf<f64>> Default for FeatureConfig<T> {
    fn default() -> Self {
        Self {
            window: 5,
            edge_curvature: (nalgebra::convert(0.2), nalgebra::convert(100.0)),
            planar_curvature: (nalgebra::convert(0.0), nalgebra::convert(2e-5)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Edge,
    Planar,
}

impl<T: Real> FeatureConfig<T> {
    pub fn classify(&self, curvature: T) -> Option<FeatureKind> {
        let within = |(low, high): (T, T)| low < curvature && curvature < high;
        if !curvature.is_finite() {
            None
        } else if within(self.edge_curvature) {
            Some(FeatureKind::Edge)
        } else if within(self.planar_curvature) {
            Some(FeatureKind::Planar)
        } else {
            None
        }
    }
}

/// Edge and planar points of one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet<T: Scalar> {
    pub edges: Vec<FeaturePoint<T>>,
    pub planes: Vec<FeaturePoint<T>>,
}

impl<T: Scalar> Default for FeatureSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> FeatureSet<T> {
    pub const fn new() -> Self {
        Self {
            edges: Vec::new(),
            planes: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len() + self.planes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.planes.is_empty()
    }
}

/// Squared norm of `sum(p_i - p_j)` over the `window` neighbours `stride`
/// positions apart on each side of `i`.
///
/// `None` when `i` is too close to either end of `positions`.
pub fn curvature<T: Real>(
    positions: &[Point3<T>],
    i: usize,
    stride: usize,
    window: usize,
) -> Option<T> {
    let reach = stride * window;
    if i < reach || i + reach >= positions.len() {
        return None;
    }
    let center = &positions[i];
    let sum = (1..=window)
        .flat_map(|k| [i - k * stride, i + k * stride])
        .fold(Vector3::zeros(), |sum, j| sum + (center - positions[j]));
    Some(sum.norm_squared())
}

/// Picks edge and planar points out of an organised scan.
///
/// The scan is expected ring-interleaved: consecutive points step through the
/// rings of one column before moving to the next column, so the same ring
/// repeats every `rings - ground_rings` positions once the ground rings are
/// filtered out.
#[derive(Debug, Clone)]
pub struct FeatureClassifier<T: Scalar> {
    config: FeatureConfig<T>,
    ground_rings: usize,
    stride: usize,
    candidates: Vec<usize>,
    positions: Vec<Point3<T>>,
}

impl<T: Real> FeatureClassifier<T> {
    pub fn new(config: FeatureConfig<T>, rings: usize, ground_rings: usize) -> Self {
        Self {
            config,
            ground_rings,
            stride: rings.saturating_sub(ground_rings).max(1),
            candidates: Vec::new(),
            positions: Vec::new(),
        }
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Classifies every point above the ground rings.
    ///
    /// `admitted`, when given, holds one flag per point of `points`; points
    /// without the flag still count as neighbours but are never emitted.
    pub fn classify(
        &mut self,
        points: &[ScanPoint<T>],
        admitted: Option<&[bool]>,
    ) -> FeatureSet<T> {
        let Self {
            config,
            ground_rings,
            stride,
            candidates,
            positions,
        } = self;

        candidates.clear();
        positions.clear();
        for (index, point) in points.iter().enumerate() {
            if point.ring >= *ground_rings {
                candidates.push(index);
                positions.push(point.position);
            }
        }

        let mut features = FeatureSet::new();
        for (i, &index) in candidates.iter().enumerate() {
            if admitted.is_some_and(|admitted| !admitted.get(index).copied().unwrap_or(false)) {
                continue;
            }
            let Some(curvature) = curvature(positions, i, *stride, config.window) else {
                continue;
            };
            let feature = FeaturePoint::from(&points[index]);
            match config.classify(curvature) {
                Some(FeatureKind::Edge) => features.edges.push(feature),
                Some(FeatureKind::Planar) => features.planes.push(feature),
                None => {}
            }
        }

        tracing::debug!(
            candidates = candidates.len(),
            edges = features.edges.len(),
            planes = features.planes.len(),
            "classified features"
        );
        features
    }
}
