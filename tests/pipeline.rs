use loam_odometry::{
    ClusterFilter, Config, ConvergenceStatus, Loam, SensorGeometry, ScanPoint,
    segmentation::SegmentationSummary,
};
use nalgebra::{Point3, Vector3};

const RINGS: usize = 16;
const COLUMNS: usize = 360;

fn geometry() -> SensorGeometry<f64> {
    SensorGeometry {
        rings: RINGS,
        columns: COLUMNS,
        vertical_resolution: 2.0,
        horizontal_resolution: 1.0,
    }
}

/// A 10 x 10 box room with the floor 1 below the sensor, ring-interleaved.
fn box_room(origin: Vector3<f64>) -> Vec<ScanPoint<f64>> {
    let mut scan = Vec::new();
    for column in 0..COLUMNS {
        let azimuth = (column as f64).to_radians();
        for ring in 0..RINGS {
            let elevation = (-15.0 + 2.0 * ring as f64).to_radians();
            let direction = Vector3::new(
                elevation.cos() * azimuth.cos(),
                elevation.cos() * azimuth.sin(),
                elevation.sin(),
            );
            let hits = [
                (5.0_f64.copysign(direction.x) - origin.x) / direction.x,
                (5.0_f64.copysign(direction.y) - origin.y) / direction.y,
                (-1.0 - origin.z) / direction.z,
            ];
            let t = hits
                .into_iter()
                .filter(|t| t.is_finite() && *t > 0.0)
                .min_by(f64::total_cmp)
                .unwrap();
            scan.push(ScanPoint::new(Point3::from(direction * t), ring, column));
        }
    }
    scan
}

fn loam(cluster_filter: ClusterFilter) -> Loam<f64> {
    Loam::new(
        Config::default()
            .with_geometry(geometry())
            .with_cluster_filter(cluster_filter),
    )
    .unwrap()
}

fn summary(loam: &Loam<f64>) -> SegmentationSummary {
    loam.last_segmentation().cloned().unwrap()
}

#[test]
fn test_two_frames_through_the_pipeline() {
    let mut loam = Loam::new(Config::default().with_geometry(geometry())).unwrap();

    let first = loam.process_frame(box_room(Vector3::zeros())).unwrap();
    assert_eq!(first.status, ConvergenceStatus::Initialized);
    assert!(loam.trajectory().is_empty());

    let summary = summary(&loam);
    assert_eq!(summary.points, RINGS * COLUMNS);
    assert_eq!(summary.projected, RINGS * COLUMNS);
    assert!(summary.ground_points > 0);
    assert!(summary.clusters >= 1);
    let features = loam.odometry().previous_features().unwrap();
    assert!(!features.edges.is_empty());
    assert!(!features.planes.is_empty());

    // The sensor moved 0.1 forward, so the new scan maps into the old one by +0.1 in x.
    let second = loam.process_frame(box_room(Vector3::new(0.1, 0.0, 0.0))).unwrap();
    assert_ne!(second.status, ConvergenceStatus::Initialized);
    assert!(second.trace.iterations() <= 10);
    assert_eq!(loam.trajectory().len(), 1);
    assert!(second.pose.is_finite());
    assert!((second.pose.tx - 0.1).abs() < 0.05, "tx = {}", second.pose.tx);

    let travelled = loam.trajectory().accumulated().translation.vector;
    assert!((travelled.x - 0.1).abs() < 0.05);
}

#[test]
fn test_strict_filter_still_tracks_frames() {
    let mut loam = loam(ClusterFilter::Strict);
    loam.process_frame(box_room(Vector3::zeros())).unwrap();
    assert!(summary(&loam).noise_cells > 0);

    let second = loam.process_frame(box_room(Vector3::new(0.1, 0.0, 0.0))).unwrap();
    assert!(second.pose.is_finite());
    assert_eq!(loam.trajectory().len(), 1);
}

#[test]
fn test_standing_still_resolves_to_identity() {
    let mut loam = loam(ClusterFilter::Informational);
    let scan = box_room(Vector3::zeros());

    loam.process_frame(scan.iter().cloned()).unwrap();
    let estimate = loam.process_frame(scan.iter().cloned()).unwrap();

    assert_eq!(estimate.status, ConvergenceStatus::Converged);
    assert!(estimate.pose.to_vector().norm() < 1e-9);

    let moved = loam.apply_current_pose([(Point3::new(1.0, 2.0, 3.0), 0_usize, 0_usize)]);
    assert!((moved[0] - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-9);
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let config = Config::<f64>::default().with_geometry(SensorGeometry {
        rings: 3,
        ..geometry()
    });
    assert!(Loam::new(config).is_err());
}

#[test]
fn test_extend_processes_every_scan() {
    let mut loam = loam(ClusterFilter::Informational);
    loam.extend((0..3).map(|step| box_room(Vector3::new(0.05 * step as f64, 0.0, 0.0))));
    assert_eq!(loam.trajectory().len(), 2);
}
