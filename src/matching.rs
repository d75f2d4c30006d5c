//! Scan-to-scan matching: association, residuals and their Jacobian.

pub mod correspondence;
pub mod residual;

pub use correspondence::{
    Correspondence, CorrespondenceKind, CorrespondencePolicy, Correspondences, LineMatch,
    PlaneMatch,
};
pub use residual::Residual;

use nalgebra::{DVector, Dyn, Matrix3, OMatrix, Point3, U6, Vector3};
use rayon::prelude::*;
use simba::scalar::SupersetOf;

use crate::{
    features::FeatureSet,
    point::FeaturePoint,
    pose::{Pose, RotationDerivatives},
    utils::Real,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig<T> {
    /// How far along the previous planar points to look for a point on another ring.
    pub plane_search_window: usize,
    /// Lines shorter and plane normals smaller than this are degenerate.
    pub degenerate_epsilon: T,
    pub policy: CorrespondencePolicy,
}

impl<T: SupersetOf<f64>> Default for MatchingConfig<T> {
    fn default() -> Self {
        Self {
            plane_search_window: 32,
            degenerate_epsilon: nalgebra::convert(1e-9),
            policy: CorrespondencePolicy::default(),
        }
    }
}

/// Residuals and Jacobian of every correspondence at one pose.
///
/// Rows are edges first, then planes, in the order of the current features.
#[derive(Debug, Clone)]
pub struct Linearization<T: Real> {
    pub residuals: DVector<T>,
    pub jacobian: OMatrix<T, Dyn, U6>,
    /// The association used, to hand back in under [`CorrespondencePolicy::ReuseWithinFrame`].
    pub correspondences: Correspondences,
    /// Rows zeroed because their geometry was degenerate or unmatched.
    pub degenerate: usize,
}

impl<T: Real> Linearization<T> {
    #[inline]
    pub fn rows(&self) -> usize {
        self.residuals.len()
    }
}

/// Everything a row needs that does not depend on the point.
struct Linearizer<'a, T: Real> {
    rotation: Matrix3<T>,
    translation: Vector3<T>,
    derivatives: RotationDerivatives<T>,
    previous: &'a FeatureSet<T>,
    config: &'a MatchingConfig<T>,
}

impl<T: Real> Linearizer<'_, T> {
    #[inline]
    fn transform(&self, point: &Point3<T>) -> Point3<T> {
        self.rotation * point + self.translation
    }

    fn row(
        &self,
        point: &FeaturePoint<T>,
        residual: Residual<T>,
        kind: CorrespondenceKind,
    ) -> Correspondence<T> {
        let jacobian =
            residual.gradient.transpose() * self.derivatives.point_jacobian(&point.position);
        Correspondence {
            residual: residual.value,
            jacobian,
            kind,
            degenerate: residual.degenerate,
        }
    }

    fn edge(
        &self,
        point: &FeaturePoint<T>,
        cached: Option<Option<LineMatch>>,
    ) -> (Option<LineMatch>, Correspondence<T>) {
        let moved = self.transform(&point.position);
        let previous = &self.previous.edges;
        let matched = cached
            .filter(|cached| cached.is_none_or(|m| m.fits(previous.len())))
            .unwrap_or_else(|| correspondence::match_line(previous, &moved));

        let residual = match matched {
            Some(LineMatch { nearest, neighbour }) => residual::point_to_line(
                &moved,
                &previous[nearest].position,
                &previous[neighbour].position,
                self.config.degenerate_epsilon,
            ),
            None => Residual::degenerate(),
        };
        (matched, self.row(point, residual, CorrespondenceKind::Edge))
    }

    fn plane(
        &self,
        point: &FeaturePoint<T>,
        cached: Option<Option<PlaneMatch>>,
    ) -> (Option<PlaneMatch>, Correspondence<T>) {
        let moved = self.transform(&point.position);
        let previous = &self.previous.planes;
        let matched = cached
            .filter(|cached| cached.is_none_or(|m| m.fits(previous.len())))
            .unwrap_or_else(|| {
                correspondence::match_plane(previous, &moved, self.config.plane_search_window)
            });

        let residual = match matched {
            Some(PlaneMatch {
                nearest,
                neighbour,
                cross_ring: Some(cross_ring),
            }) => residual::point_to_plane(
                &moved,
                &previous[nearest].position,
                &previous[neighbour].position,
                &previous[cross_ring].position,
                self.config.degenerate_epsilon,
            ),
            _ => Residual::degenerate(),
        };
        (matched, self.row(point, residual, CorrespondenceKind::Plane))
    }
}

/// Associates current features with the previous scan and linearises the
/// point-to-line and point-to-plane distances around a pose.
#[derive(Debug, Clone)]
pub struct Matcher<T> {
    config: MatchingConfig<T>,
}

impl<T: SupersetOf<f64>> Default for Matcher<T> {
    fn default() -> Self {
        Self {
            config: MatchingConfig::default(),
        }
    }
}

impl<T: Real> Matcher<T> {
    pub const fn new(config: MatchingConfig<T>) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &MatchingConfig<T> {
        &self.config
    }

    /// Evaluates every correspondence at `pose`.
    ///
    /// `cached` is only used under [`CorrespondencePolicy::ReuseWithinFrame`]
    /// and only when it holds one entry per current feature. Entries pointing
    /// past the end of `previous` are searched again.
    pub fn linearize(
        &self,
        current: &FeatureSet<T>,
        previous: &FeatureSet<T>,
        pose: &Pose<T>,
        cached: Option<Correspondences>,
    ) -> Linearization<T> {
        let cached = cached.filter(|cached| {
            self.config.policy == CorrespondencePolicy::ReuseWithinFrame
                && cached.edges.len() == current.edges.len()
                && cached.planes.len() == current.planes.len()
        });
        if cached.as_ref().is_some_and(|cached| !cached.fits(current, previous)) {
            tracing::debug!("stale correspondences are searched again");
        }
        let linearizer = Linearizer {
            rotation: pose.rotation_matrix(),
            translation: pose.translation(),
            derivatives: pose.derivatives(),
            previous,
            config: &self.config,
        };

        let (edge_matches, edge_rows): (Vec<_>, Vec<_>) = current
            .edges
            .par_iter()
            .enumerate()
            .map(|(i, point)| linearizer.edge(point, cached.as_ref().map(|cached| cached.edges[i])))
            .unzip();
        let (plane_matches, plane_rows): (Vec<_>, Vec<_>) = current
            .planes
            .par_iter()
            .enumerate()
            .map(|(i, point)| linearizer.plane(point, cached.as_ref().map(|cached| cached.planes[i])))
            .unzip();

        let rows: Vec<_> = edge_rows.into_iter().chain(plane_rows).collect();
        let degenerate = rows.iter().filter(|row| row.degenerate).count();
        if degenerate > 0 {
            tracing::warn!(degenerate, rows = rows.len(), "degenerate correspondences zeroed");
        }

        Linearization {
            residuals: DVector::from_iterator(rows.len(), rows.iter().map(|row| row.residual)),
            jacobian: OMatrix::<T, Dyn, U6>::from_fn(rows.len(), |r, c| rows[r].jacobian[c]),
            correspondences: Correspondences {
                edges: edge_matches,
                planes: plane_matches,
            },
            degenerate,
        }
    }
}
