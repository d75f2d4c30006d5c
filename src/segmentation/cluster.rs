use std::collections::VecDeque;

use crate::{
    context::{Contextual, WithContext},
    geometry::{Axis, GridIndex, SensorGeometry},
    utils::{Real, max_min},
};

use super::{GroundMask, RangeImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterLabel {
    /// Not reached by the labelling pass yet.
    #[default]
    Unlabeled,
    /// No return in this cell.
    Invalid,
    Ground,
    /// Part of a connected region too small to keep.
    Noise,
    /// Accepted cluster, ids start at 1 in the order clusters are found.
    Cluster(usize),
}

impl ClusterLabel {
    #[inline]
    pub const fn cluster_id(self) -> Option<usize> {
        match self {
            Self::Cluster(id) => Some(id),
            _ => None,
        }
    }
}

/// The final label of every cell of the range grid.
#[derive(Debug, Clone)]
pub struct ClusterLabelMap {
    columns: usize,
    labels: Vec<ClusterLabel>,
    /// Cell count of each accepted cluster, indexed by `id - 1`.
    sizes: Vec<usize>,
}

impl ClusterLabelMap {
    /// Empty cells become [`ClusterLabel::Invalid`] and ground cells [`ClusterLabel::Ground`],
    /// the rest stays [`ClusterLabel::Unlabeled`].
    fn prelabeled<T: Real>(image: &RangeImage<T>, ground: &GroundMask) -> Self {
        let geometry = image.geometry();
        let labels = geometry
            .iter_cells()
            .map(|index| match image.get(index) {
                None => ClusterLabel::Invalid,
                Some(cell) if ground.is_ground(cell.point) => ClusterLabel::Ground,
                Some(_) => ClusterLabel::Unlabeled,
            })
            .collect();
        Self {
            columns: geometry.columns,
            labels,
            sizes: Vec::new(),
        }
    }

    #[inline]
    fn flat(&self, index: GridIndex) -> usize {
        index.ring * self.columns + index.column
    }

    #[inline]
    pub fn get(&self, index: GridIndex) -> ClusterLabel {
        self.labels
            .get(self.flat(index))
            .copied()
            .unwrap_or(ClusterLabel::Invalid)
    }

    /// The label of the cell a scan point was projected into.
    pub fn label_of<T: Real>(&self, image: &RangeImage<T>, point: usize) -> Option<ClusterLabel> {
        image.cell_of(point).map(|index| self.get(index))
    }

    pub fn cluster_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn cluster_sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn count(&self, label: ClusterLabel) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = ClusterLabel> + '_ {
        self.labels.iter().copied()
    }

    fn resolve(&mut self, members: &[GridIndex], min_cluster_size: usize) {
        let label = if members.len() >= min_cluster_size {
            self.sizes.push(members.len());
            ClusterLabel::Cluster(self.sizes.len())
        } else {
            ClusterLabel::Noise
        };
        for &member in members {
            let flat = self.flat(member);
            self.labels[flat] = label;
        }
    }
}

/// `sin` and `cos` of the angle between two neighbouring beams along each axis.
#[derive(Debug, Clone)]
struct BeamSpacing<T> {
    ring: (T, T),
    column: (T, T),
    /// In radians.
    smoothness_angle: T,
}

impl<T: Real> BeamSpacing<T> {
    fn new(geometry: &SensorGeometry<T>, smoothness_angle: T) -> Self {
        Self {
            ring: geometry.vertical_resolution.to_radians().sin_cos(),
            column: geometry.horizontal_resolution.to_radians().sin_cos(),
            smoothness_angle: smoothness_angle.to_radians(),
        }
    }

    /// Two returns lie on one continuous surface when the angle between the
    /// farther beam and the segment joining them is wide enough.
    #[inline]
    fn is_smooth(&self, a: T, b: T, axis: Axis) -> bool {
        let (sin, cos) = match axis {
            Axis::Ring => self.ring,
            Axis::Column => self.column,
        };
        let (d1, d2) = max_min(a, b);
        (d2 * sin).atan2(d1 - d2 * cos) > self.smoothness_angle
    }
}

/// Scratch reused from one scan to the next.
#[derive(Debug, Default)]
struct Expansion {
    queue: VecDeque<GridIndex>,
    visited: Vec<bool>,
    members: Vec<GridIndex>,
}

impl<T: Real> Contextual<&mut Expansion, (&RangeImage<T>, &BeamSpacing<T>)> {
    /// Breadth-first flood fill from `seed` over unlabeled cells.
    ///
    /// Returns every cell pulled into the region, `seed` included.
    fn expand(&mut self, seed: GridIndex, labels: &ClusterLabelMap) -> &[GridIndex] {
        let &mut Contextual {
            inner:
                Expansion {
                    queue,
                    visited,
                    members,
                },
            context: (image, spacing),
        } = self;
        let geometry = image.geometry();

        queue.clear();
        members.clear();
        visited[geometry.flat(seed)] = true;
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            members.push(current);
            let Some(range) = image.range(current) else {
                continue;
            };

            for (neighbour, axis) in geometry.neighbours(current) {
                let flat = geometry.flat(neighbour);
                if visited[flat] || labels.get(neighbour) != ClusterLabel::Unlabeled {
                    continue;
                }
                let Some(neighbour_range) = image.range(neighbour) else {
                    continue;
                };
                if spacing.is_smooth(range, neighbour_range, axis) {
                    visited[flat] = true;
                    queue.push_back(neighbour);
                }
            }
        }

        members
    }
}

/// Groups non-ground cells of the range grid into connected clusters.
#[derive(Debug)]
pub struct ClusterLabeler<T> {
    spacing: BeamSpacing<T>,
    min_cluster_size: usize,
    expansion: Expansion,
}

impl<T: Real> ClusterLabeler<T> {
    /// `smoothness_angle` is in degrees.
    pub fn new(geometry: &SensorGeometry<T>, smoothness_angle: T, min_cluster_size: usize) -> Self {
        Self {
            spacing: BeamSpacing::new(geometry, smoothness_angle),
            min_cluster_size,
            expansion: Expansion {
                queue: VecDeque::with_capacity(geometry.cells()),
                visited: Vec::with_capacity(geometry.cells()),
                members: Vec::with_capacity(geometry.cells()),
            },
        }
    }

    /// Labels every cell of the grid exactly once.
    pub fn label(&mut self, image: &RangeImage<T>, ground: &GroundMask) -> ClusterLabelMap {
        let geometry = image.geometry();
        let mut labels = ClusterLabelMap::prelabeled(image, ground);

        self.expansion.visited.clear();
        self.expansion.visited.resize(geometry.cells(), false);

        for seed in geometry.iter_cells() {
            if labels.get(seed) != ClusterLabel::Unlabeled {
                continue;
            }
            let mut expansion = self.expansion.mut_with_context((image, &self.spacing));
            let members = expansion.expand(seed, &labels);
            tracing::trace!(?seed, size = members.len(), "expanded region");
            labels.resolve(members, self.min_cluster_size);
        }

        labels
    }
}
