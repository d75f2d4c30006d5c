#![deny(clippy::unwrap_used)]
#![deny(clippy::undocumented_unsafe_blocks)]
#![deny(unused_must_use)]
mod context;
pub mod algorithm;
pub mod error;
pub mod features;
pub mod frame;
pub mod geometry;
pub mod matching;
pub mod odometry;
pub mod point;
pub mod pose;
pub mod segmentation;
pub mod utils;

pub use algorithm::loam::{ClusterFilter, Config, Loam};
pub use error::{Error, Result};
pub use geometry::SensorGeometry;
pub use odometry::{ConvergenceStatus, FrameEstimate};
pub use point::{LidarPoint, ScanPoint};
pub use pose::Pose;
