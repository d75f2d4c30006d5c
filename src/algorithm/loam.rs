pub mod config;

pub use config::{ClusterFilter, Config};

use nalgebra::Point3;

use crate::{
    error::Result,
    features::FeatureClassifier,
    frame::{Framed, Scan, WorldPoint},
    matching::Matcher,
    odometry::{FrameEstimate, Odometry, Trajectory},
    point::{LidarPoint, ScanPoint},
    pose::Pose,
    segmentation::{Segmentation, SegmentationSummary, Segmenter},
    utils::{CollectTo, Real},
};

/// LiDAR odometry front end.
///
/// # Per frame
/// ```text
/// scan ─> range image ─> ground mask ─> clusters
///                                          │
///              previous features <─ features ─> Gauss-Newton ─> pose ─> trajectory
/// ```
pub struct Loam<T: Real> {
    segmenter: Segmenter<T>,
    classifier: FeatureClassifier<T>,
    odometry: Odometry<T>,
    cluster_filter: ClusterFilter,
    // per-frame buffers
    scan: Vec<ScanPoint<T>>,
    admitted: Vec<bool>,
    last_segmentation: Option<SegmentationSummary>,
}

impl<T: Real> Loam<T> {
    pub fn new(config: Config<T>) -> Result<Self> {
        let Config {
            geometry,
            segmentation,
            features,
            matching,
            odometry,
            cluster_filter,
        } = config;

        let classifier = FeatureClassifier::new(features, geometry.rings, segmentation.ground_rings);
        let capacity = geometry.cells();
        let segmenter = Segmenter::new(geometry, &segmentation)?;

        Ok(Self {
            segmenter,
            classifier,
            odometry: Odometry::new(odometry, Matcher::new(matching)),
            cluster_filter,
            scan: Vec::with_capacity(capacity),
            admitted: Vec::with_capacity(capacity),
            last_segmentation: None,
        })
    }

    /// Runs one scan through segmentation, feature extraction and odometry.
    ///
    /// Points must arrive ring-interleaved, see [`FeatureClassifier`].
    pub fn process_frame<I>(&mut self, points: I) -> Result<FrameEstimate<T>>
    where
        I: IntoIterator<Item: LidarPoint<T>>,
    {
        self.scan.clear();
        points
            .into_iter()
            .map(LidarPoint::to_scan_point)
            .collect_to(&mut self.scan);

        let segmentation = self.segmenter.segment(&self.scan);
        let summary = segmentation.summary();
        tracing::debug!(?summary, "segmented scan");

        self.admit(&segmentation);
        let features = self.classifier.classify(&self.scan, Some(self.admitted.as_slice()));
        self.last_segmentation = Some(summary);

        let estimate = self.odometry.process(features)?;
        tracing::debug!(
            status = ?estimate.status,
            iterations = estimate.trace.iterations(),
            correspondences = estimate.correspondences,
            "frame processed"
        );
        Ok(estimate)
    }

    /// Marks which points of the scan may become features.
    fn admit(&mut self, segmentation: &Segmentation<T>) {
        let strict = self.cluster_filter == ClusterFilter::Strict;
        self.admitted.clear();
        self.admitted.extend((0..self.scan.len()).map(|point| {
            segmentation.image.cell_of(point).is_some()
                && !segmentation.ground.is_ground(point)
                && (!strict || segmentation.is_clustered(point))
        }));
    }

    /// Moves points by the motion resolved for the latest frame, keeping only x, y and z.
    pub fn apply_current_pose<I>(&self, points: I) -> Vec<Point3<T>>
    where
        I: IntoIterator<Item: LidarPoint<T>>,
    {
        self.odometry
            .current_pose()
            .transform(points.into_iter().map(|point| point.to_scan_point().position))
    }

    /// Expresses points of the latest scan in the frame of the first one.
    pub fn apply_accumulated_pose<I>(&self, points: I) -> Vec<WorldPoint<T>>
    where
        I: IntoIterator<Item: LidarPoint<T>>,
    {
        let scan_to_world = self.odometry.trajectory().accumulated();
        points
            .into_iter()
            .map(|point| Framed::<_, Scan>::new(point.to_scan_point().position) * &scan_to_world)
            .collect()
    }

    #[inline]
    pub fn current_pose(&self) -> &Pose<T> {
        self.odometry.current_pose()
    }

    #[inline]
    pub fn trajectory(&self) -> &Trajectory<T> {
        self.odometry.trajectory()
    }

    #[inline]
    pub fn odometry(&self) -> &Odometry<T> {
        &self.odometry
    }

    /// Counts from the segmentation of the latest frame.
    #[inline]
    pub fn last_segmentation(&self) -> Option<&SegmentationSummary> {
        self.last_segmentation.as_ref()
    }
}

/// Feeds whole scans; frames that fail are logged and skipped.
impl<T, P> Extend<P> for Loam<T>
where
    T: Real,
    P: IntoIterator<Item: LidarPoint<T>>,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = P>,
    {
        iter.into_iter().for_each(|scan| {
            if let Err(error) = self.process_frame(scan) {
                tracing::error!(%error, "frame dropped");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{geometry::SensorGeometry, odometry::ConvergenceStatus};

    fn small_config() -> Config<f64> {
        Config::default().with_geometry(SensorGeometry {
            rings: 8,
            columns: 60,
            vertical_resolution: 2.0,
            horizontal_resolution: 0.5,
        })
    }

    /// Casts the beams of `small_config` into a wall at x = 10 standing on a
    /// floor 1.5 below the sensor, column by column.
    fn scan() -> Vec<([f64; 3], usize, usize)> {
        let mut points = Vec::new();
        for column in 0..60 {
            let azimuth = ((column as f64 - 30.0) * 0.5).to_radians();
            for ring in 0..8 {
                let elevation = (-15.0 + 2.0 * ring as f64).to_radians();
                let direction = [
                    elevation.cos() * azimuth.cos(),
                    elevation.cos() * azimuth.sin(),
                    elevation.sin(),
                ];
                let to_wall = 10.0 / direction[0];
                let to_floor = -1.5 / direction[2];
                let t = if to_floor > 0.0 { to_wall.min(to_floor) } else { to_wall };
                points.push((direction.map(|d| d * t), ring, column));
            }
        }
        points
    }

    #[test]
    fn test_ground_and_unclustered_points_are_not_admitted() {
        let mut loam = Loam::new(small_config()).unwrap();
        let estimate = loam.process_frame(scan()).unwrap();
        assert_eq!(estimate.status, ConvergenceStatus::Initialized);

        let summary = loam.last_segmentation().unwrap();
        assert_eq!(summary.ground_points, 4 * 60);
        assert_eq!(summary.clusters, 1);
        assert_eq!(summary.clustered_cells, 4 * 60);

        assert!(
            (0..loam.scan.len()).all(|point| loam.admitted[point] == (loam.scan[point].ring >= 4))
        );
        let features = loam.odometry().previous_features().unwrap();
        assert!(features.edges.iter().chain(&features.planes).all(|feature| feature.ring >= 4));
    }

    #[test]
    fn test_strict_filter_drops_noise() {
        let mut points = scan();
        // A lone return well in front of the wall, taking over a wall cell.
        points.push(([3.0, 0.0, 1.0], 6, 59));
        let config = small_config();

        let mut strict =
            Loam::new(config.clone().with_cluster_filter(ClusterFilter::Strict)).unwrap();
        strict.process_frame(points.iter().copied()).unwrap();
        let mut informational =
            Loam::new(config.with_cluster_filter(ClusterFilter::Informational)).unwrap();
        informational.process_frame(points.iter().copied()).unwrap();

        let lone = points.len() - 1;
        assert!(!strict.admitted[lone]);
        assert!(informational.admitted[lone]);
        assert_eq!(strict.last_segmentation().map(|summary| summary.noise_cells), Some(1));
    }

    #[test]
    fn test_clusters_are_informational_by_default() {
        let mut points = scan();
        points.push(([3.0, 0.0, 1.0], 6, 59));

        let mut loam = Loam::new(small_config()).unwrap();
        loam.process_frame(points.iter().copied()).unwrap();
        assert_eq!(loam.cluster_filter, ClusterFilter::Informational);
        assert!(loam.admitted[points.len() - 1]);
    }

    #[test]
    fn test_apply_pose_keeps_xyz_only() {
        let mut loam = Loam::new(small_config()).unwrap();
        loam.extend([scan(), scan()]);
        assert_eq!(loam.trajectory().len(), 1);

        let labelled: [([f64; 4], usize, usize); 1] = [([1.0, 2.0, 3.0, 99.0], 0, 0)];
        let moved = loam.apply_current_pose(labelled);
        let expected = loam.current_pose().transform_point(&Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(moved[0], expected, epsilon = 1e-12);

        let plain: [(Point3<f64>, usize, usize); 1] = [(Point3::new(1.0, 2.0, 3.0), 0, 0)];
        let world = loam.apply_accumulated_pose(plain);
        assert_relative_eq!(*world[0], expected, epsilon = 1e-9);
    }
}
