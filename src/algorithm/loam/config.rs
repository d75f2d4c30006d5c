use simba::scalar::SupersetOf;

use crate::{
    features::FeatureConfig, geometry::SensorGeometry, matching::MatchingConfig,
    odometry::OdometryConfig, segmentation::SegmentationConfig,
};

/// How the clustering result restricts feature extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterFilter {
    /// Only points inside an accepted cluster may become features.
    ///
    /// Oblique surfaces fail the smoothness test along the columns and end up
    /// as noise, taking their corner points with them.
    Strict,
    /// Clusters are computed and reported but every non-ground point is a candidate.
    #[default]
    Informational,
}

/// The configuration of the whole front end.
#[derive(Debug, Clone, PartialEq)]
pub struct Config<T> {
    pub geometry: SensorGeometry<T>,
    pub segmentation: SegmentationConfig<T>,
    pub features: FeatureConfig<T>,
    pub matching: MatchingConfig<T>,
    pub odometry: OdometryConfig<T>,
    pub cluster_filter: ClusterFilter,
}

impl<T: SupersetOf<f64>> Default for Config<T> {
    fn default() -> Self {
        Self {
            geometry: Default::default(),
            segmentation: Default::default(),
            features: Default::default(),
            matching: Default::default(),
            odometry: Default::default(),
            cluster_filter: Default::default(),
        }
    }
}

impl<T> Config<T> {
    #[inline]
    pub fn with_geometry(self, geometry: SensorGeometry<T>) -> Self {
        Self { geometry, ..self }
    }

    #[inline]
    pub fn with_cluster_filter(self, cluster_filter: ClusterFilter) -> Self {
        Self {
            cluster_filter,
            ..self
        }
    }
}
