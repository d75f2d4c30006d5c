use loam_odometry::{Config, Loam, SensorGeometry};
use nalgebra::{Point3, Vector3};

const RINGS: usize = 16;
const COLUMNS: usize = 900;

/// Casts every beam from `origin` into a 12 x 8 room whose floor is 1.2 below the sensor.
fn room_scan(origin: Vector3<f64>) -> Vec<(Point3<f64>, usize, usize)> {
    let (half_x, half_y, floor) = (6.0_f64, 4.0_f64, -1.2_f64);
    let mut scan = Vec::with_capacity(RINGS * COLUMNS);
    for column in 0..COLUMNS {
        let azimuth = (column as f64 * 360.0 / COLUMNS as f64).to_radians();
        for ring in 0..RINGS {
            let elevation = (-15.0 + 2.0 * ring as f64).to_radians();
            let direction = Vector3::new(
                elevation.cos() * azimuth.cos(),
                elevation.cos() * azimuth.sin(),
                elevation.sin(),
            );
            let hits = [
                (half_x.copysign(direction.x) - origin.x) / direction.x,
                (half_y.copysign(direction.y) - origin.y) / direction.y,
                (floor - origin.z) / direction.z,
            ];
            let Some(t) = hits
                .into_iter()
                .filter(|t| t.is_finite() && *t > 0.0)
                .min_by(f64::total_cmp)
            else {
                continue;
            };
            scan.push((Point3::from(direction * t), ring, column));
        }
    }
    scan
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("loam_odometry=info")),
        )
        .init();

    let config = Config::default().with_geometry(SensorGeometry {
        rings: RINGS,
        columns: COLUMNS,
        vertical_resolution: 2.0,
        horizontal_resolution: 360.0 / COLUMNS as f64,
    });
    let mut loam = match Loam::new(config) {
        Ok(loam) => loam,
        Err(error) => {
            eprintln!("invalid configuration: {error}");
            return;
        }
    };

    let steps = option_env!("STEPS")
        .and_then(|s| {
            s.parse()
                .inspect_err(|e| eprintln!("Invalid STEPS: {e}"))
                .ok()
        })
        .unwrap_or(5);

    for step in 0..steps {
        let origin = Vector3::new(0.05 * step as f64, 0.0, 0.0);
        match loam.process_frame(room_scan(origin)) {
            Ok(estimate) => {
                let summary = loam.last_segmentation().cloned().unwrap_or_default();
                let pose = estimate.pose.to_vector();
                tracing::info!(
                    step,
                    status = ?estimate.status,
                    iterations = estimate.trace.iterations(),
                    ground = summary.ground_points,
                    clusters = summary.clusters,
                    pose = ?pose.as_slice(),
                    "frame"
                );
            }
            Err(error) => tracing::error!(step, %error, "frame failed"),
        }
    }

    let world = loam.trajectory().accumulated();
    println!("travelled: {:?}", world.translation.vector);
}
