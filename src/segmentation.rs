//! Range-image segmentation: ground removal and cluster labelling.

pub mod cluster;
pub mod ground;
pub mod range_image;

pub use cluster::{ClusterLabel, ClusterLabelMap, ClusterLabeler};
pub use ground::{GroundMask, GroundSegmenter};
pub use range_image::{DroppedPoints, RangeCell, RangeImage};

use nalgebra::Scalar;
use simba::scalar::SupersetOf;

use crate::{
    error::{Error, Result},
    geometry::SensorGeometry,
    point::ScanPoint,
    utils::Real,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationConfig<T> {
    /// Returns closer than this are not trusted.
    pub min_range: T,
    /// How many of the lowest ring pairs may hit the ground.
    pub ground_rings: usize,
    /// Largest slope, in degrees, between two rings of the same column still taken as ground.
    pub ground_angle: T,
    /// Smallest angle, in degrees, for two neighbouring cells to join the same cluster.
    pub smoothness_angle: T,
    pub min_cluster_size: usize,
}

impl<T: SupersetOf<f64>> Default for SegmentationConfig<T> {
    fn default() -> Self {
        Self {
            min_range: nalgebra::convert(1.0),
            ground_rings: 4,
            ground_angle: nalgebra::convert(10.0),
            smoothness_angle: nalgebra::convert(60.0),
            min_cluster_size: 30,
        }
    }
}

/// The frame-scoped result of segmenting one scan.
#[derive(Debug, Clone)]
pub struct Segmentation<T: Scalar> {
    pub image: RangeImage<T>,
    pub ground: GroundMask,
    pub labels: ClusterLabelMap,
}

/// Per-scan counts kept after the grids are gone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentationSummary {
    pub points: usize,
    pub projected: usize,
    pub dropped: DroppedPoints,
    pub ground_points: usize,
    pub clusters: usize,
    pub clustered_cells: usize,
    pub noise_cells: usize,
}

impl<T: Real> Segmentation<T> {
    pub fn summary(&self) -> SegmentationSummary {
        SegmentationSummary {
            points: self.ground.len(),
            projected: self.image.occupied(),
            dropped: self.image.dropped(),
            ground_points: self.ground.count(),
            clusters: self.labels.cluster_count(),
            clustered_cells: self.labels.cluster_sizes().iter().sum(),
            noise_cells: self.labels.count(ClusterLabel::Noise),
        }
    }

    /// Whether a point landed in an accepted cluster.
    pub fn is_clustered(&self, point: usize) -> bool {
        self.labels
            .label_of(&self.image, point)
            .and_then(ClusterLabel::cluster_id)
            .is_some()
    }
}

/// Runs projection, ground marking and clustering over one scan.
#[derive(Debug)]
pub struct Segmenter<T: Scalar> {
    geometry: SensorGeometry<T>,
    min_range: T,
    ground: GroundSegmenter<T>,
    labeler: ClusterLabeler<T>,
}

impl<T: Real> Segmenter<T> {
    pub fn new(geometry: SensorGeometry<T>, config: &SegmentationConfig<T>) -> Result<Self> {
        geometry.validate()?;
        if config.ground_rings >= geometry.rings {
            return Err(Error::TooFewRings {
                ground_rings: config.ground_rings,
                rings: geometry.rings,
            });
        }

        Ok(Self {
            ground: GroundSegmenter::new(config.ground_rings, config.ground_angle),
            labeler: ClusterLabeler::new(&geometry, config.smoothness_angle, config.min_cluster_size),
            min_range: config.min_range,
            geometry,
        })
    }

    #[inline]
    pub fn geometry(&self) -> &SensorGeometry<T> {
        &self.geometry
    }

    pub fn segment(&mut self, points: &[ScanPoint<T>]) -> Segmentation<T> {
        let image = RangeImage::project(points, &self.geometry, self.min_range);
        let ground = self.ground.mark_ground(&image, points);
        let labels = self.labeler.label(&image, &ground);

        Segmentation {
            image,
            ground,
            labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Point3;

    use super::*;

    #[test]
    fn test_rejects_geometry_without_feature_rings() {
        let geometry = SensorGeometry::<f64> {
            rings: 4,
            ..Default::default()
        };
        let result = Segmenter::new(geometry, &SegmentationConfig::default());
        assert_eq!(
            result.err(),
            Some(Error::TooFewRings {
                ground_rings: 4,
                rings: 4
            })
        );

        let empty = SensorGeometry::<f64> {
            columns: 0,
            ..Default::default()
        };
        assert!(matches!(
            Segmenter::new(empty, &SegmentationConfig::default()),
            Err(Error::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_summary_counts() {
        let geometry = SensorGeometry {
            rings: 8,
            columns: 40,
            ..Default::default()
        };
        let mut segmenter = Segmenter::new(geometry, &SegmentationConfig::default()).unwrap();

        // A floor in the two lowest rings and a wall above it.
        let mut points: Vec<_> = (0..40)
            .flat_map(|column| {
                [
                    ScanPoint::new(Point3::new(5.0, 0.0, -1.0), 0, column),
                    ScanPoint::new(Point3::new(10.0, 0.0, -1.0), 1, column),
                ]
            })
            .collect();
        points.extend(
            itertools::iproduct!(4..8, 0..10)
                .map(|(ring, column)| ScanPoint::new(Point3::new(10.0, 0.0, 0.0), ring, column)),
        );
        points.push(ScanPoint::new(Point3::new(0.1, 0.0, 0.0), 6, 30));

        let segmentation = segmenter.segment(&points);
        let summary = segmentation.summary();

        assert_eq!(summary.points, 121);
        assert_eq!(summary.projected, 120);
        assert_eq!(summary.dropped.too_close, 1);
        assert_eq!(summary.ground_points, 80);
        assert_eq!(summary.clusters, 1);
        assert_eq!(summary.clustered_cells, 40);
        assert_eq!(summary.noise_cells, 0);
        assert!(segmentation.is_clustered(80));
        assert!(!segmentation.is_clustered(0));
        assert!(!segmentation.is_clustered(120));
    }
}
