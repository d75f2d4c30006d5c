//! Brute-force association of current features with the previous scan.

use std::cmp::Ordering;

use nalgebra::{Point3, RowVector6, Scalar};

use crate::{features::FeatureSet, point::FeaturePoint, utils::Real};

/// Whether nearest neighbours are searched again on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrespondencePolicy {
    #[default]
    Recompute,
    /// Search once per frame and keep the indices for the remaining iterations.
    ///
    /// Faster, but the association is frozen at the initial guess.
    ReuseWithinFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrespondenceKind {
    Edge,
    Plane,
}

/// Indices into the previous edge points defining a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMatch {
    pub nearest: usize,
    pub neighbour: usize,
}

impl LineMatch {
    /// Whether every index points into a set of `len` previous points.
    #[inline]
    pub const fn fits(&self, len: usize) -> bool {
        self.nearest < len && self.neighbour < len
    }
}

/// Indices into the previous planar points defining a plane.
///
/// `cross_ring` is `None` when no point of another ring lies close enough in
/// the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneMatch {
    pub nearest: usize,
    pub neighbour: usize,
    pub cross_ring: Option<usize>,
}

impl PlaneMatch {
    /// Whether every index points into a set of `len` previous points.
    #[inline]
    pub fn fits(&self, len: usize) -> bool {
        self.nearest < len && self.neighbour < len && self.cross_ring.is_none_or(|c| c < len)
    }
}

/// One entry per current feature, `None` when nothing could be associated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correspondences {
    pub edges: Vec<Option<LineMatch>>,
    pub planes: Vec<Option<PlaneMatch>>,
}

impl Correspondences {
    /// Whether there is one entry per current feature and every index points
    /// into the previous features.
    pub fn fits<T: Scalar>(&self, current: &FeatureSet<T>, previous: &FeatureSet<T>) -> bool {
        let (edges, planes) = (previous.edges.len(), previous.planes.len());
        self.edges.len() == current.edges.len()
            && self.planes.len() == current.planes.len()
            && self.edges.iter().flatten().all(|m| m.fits(edges))
            && self.planes.iter().flatten().all(|m| m.fits(planes))
    }
}

/// One residual row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence<T: Real> {
    pub residual: T,
    pub jacobian: RowVector6<T>,
    pub kind: CorrespondenceKind,
    pub degenerate: bool,
}

/// Index of the point closest to `query`.
pub fn nearest<T: Real>(points: &[FeaturePoint<T>], query: &Point3<T>) -> Option<usize> {
    points
        .iter()
        .map(|point| nalgebra::distance_squared(&point.position, query))
        .enumerate()
        .filter(|(_, distance)| distance.is_finite())
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|(index, _)| index)
}

/// The point before `index` in scan order, or the one after for the first point.
#[inline]
pub fn angular_neighbour(index: usize, len: usize) -> Option<usize> {
    let neighbour = if index == 0 { 1 } else { index - 1 };
    (neighbour < len && neighbour != index).then_some(neighbour)
}

/// Looks up to `window` positions past `nearest`, then before it, for a point
/// on a different ring than `nearest`. `skip` is never returned.
pub fn cross_ring_partner<T: Real>(
    points: &[FeaturePoint<T>],
    nearest: usize,
    skip: usize,
    window: usize,
) -> Option<usize> {
    let ring = points.get(nearest)?.ring;
    let differs = |&index: &usize| index != skip && points[index].ring != ring;

    let forward = (1..=window)
        .map_while(|offset| Some(nearest + offset).filter(|&index| index < points.len()))
        .find(differs);
    forward.or_else(|| {
        (1..=window)
            .map_while(|offset| nearest.checked_sub(offset))
            .find(differs)
    })
}

pub fn match_line<T: Real>(points: &[FeaturePoint<T>], query: &Point3<T>) -> Option<LineMatch> {
    let nearest = nearest(points, query)?;
    let neighbour = angular_neighbour(nearest, points.len())?;
    Some(LineMatch { nearest, neighbour })
}

pub fn match_plane<T: Real>(
    points: &[FeaturePoint<T>],
    query: &Point3<T>,
    window: usize,
) -> Option<PlaneMatch> {
    let nearest = nearest(points, query)?;
    let neighbour = angular_neighbour(nearest, points.len())?;
    Some(PlaneMatch {
        nearest,
        neighbour,
        cross_ring: cross_ring_partner(points, nearest, neighbour, window),
    })
}
