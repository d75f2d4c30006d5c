use nalgebra::Isometry3;

use crate::{
    frame::{Framed, Previous, Scan, ScanToWorld, World},
    pose::Pose,
    utils::Real,
};

/// Append-only history of resolved inter-frame motions.
///
/// Entry `k` maps the sensor frame of sweep `k + 1` into the frame of sweep `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<T> {
    poses: Vec<Pose<T>>,
}

impl<T: Real> Default for Trajectory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Real> Trajectory<T> {
    pub const fn new() -> Self {
        Self { poses: Vec::new() }
    }

    pub(crate) fn push(&mut self, pose: Pose<T>) {
        self.poses.push(pose);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&Pose<T>> {
        self.poses.last()
    }

    pub fn poses(&self) -> &[Pose<T>] {
        &self.poses
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pose<T>> {
        self.poses.iter()
    }

    /// The latest sweep expressed in the frame of the first one.
    pub fn accumulated(&self) -> ScanToWorld<T> {
        self.poses.iter().fold(
            Framed::new(Isometry3::identity()),
            |scan_to_world: ScanToWorld<T>, pose| {
                let previous_to_world: Framed<_, fn(Previous) -> World> =
                    Framed::new(scan_to_world.into_inner());
                let scan_to_previous: Framed<_, fn(Scan) -> Previous> =
                    Framed::new(pose.to_isometry());
                previous_to_world.after(&scan_to_previous)
            },
        )
    }

    /// [`Self::accumulated`] as Euler angles and translation.
    pub fn accumulated_pose(&self) -> Pose<T> {
        self.poses
            .iter()
            .fold(Pose::identity(), |world, pose| world.compose(pose))
    }
}

impl<'a, T> IntoIterator for &'a Trajectory<T> {
    type Item = &'a Pose<T>;
    type IntoIter = std::slice::Iter<'a, Pose<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.iter()
    }
}
