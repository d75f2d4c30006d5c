//! Fixed sensor geometry of a rotating multi-ring LiDAR.

use nalgebra::Scalar;
use simba::scalar::SupersetOf;

use crate::error::{Error, Result};

/// The layout of the range grid: `rings` scan lines by `columns` azimuth bins.
///
/// Every grid, queue and label buffer of the segmentation stage is sized from this.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorGeometry<T> {
    pub rings: usize,
    pub columns: usize,
    /// Angle between two adjacent rings, in degrees.
    pub vertical_resolution: T,
    /// Angle between two adjacent columns, in degrees.
    pub horizontal_resolution: T,
}

impl<T: SupersetOf<f64>> Default for SensorGeometry<T> {
    /// A 16 ring sensor binned into 1800 columns (0.2° steps).
    fn default() -> Self {
        Self {
            rings: 16,
            columns: 1800,
            vertical_resolution: nalgebra::convert(2.0),
            horizontal_resolution: nalgebra::convert(0.2),
        }
    }
}

/// A `(ring, column)` cell of the range grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridIndex {
    pub ring: usize,
    pub column: usize,
}

/// Which grid axis separates two neighbouring cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Ring,
    Column,
}

impl GridIndex {
    pub const fn new(ring: usize, column: usize) -> Self {
        Self { ring, column }
    }
}

impl<T: Scalar> SensorGeometry<T> {
    pub fn validate(&self) -> Result<()> {
        if self.rings == 0 || self.columns == 0 {
            return Err(Error::InvalidGeometry {
                rings: self.rings,
                columns: self.columns,
            });
        }
        Ok(())
    }

    #[inline]
    pub const fn cells(&self) -> usize {
        self.rings * self.columns
    }

    /// Returns `None` when the ring or column falls outside the grid.
    #[inline]
    pub fn grid_index(&self, ring: usize, column: usize) -> Option<GridIndex> {
        (ring < self.rings && column < self.columns).then_some(GridIndex { ring, column })
    }

    /// Row-major flat offset of a cell.
    #[inline]
    pub const fn flat(&self, index: GridIndex) -> usize {
        index.ring * self.columns + index.column
    }

    #[inline]
    pub const fn unflat(&self, flat: usize) -> GridIndex {
        GridIndex {
            ring: flat / self.columns,
            column: flat % self.columns,
        }
    }

    /// Row-major iteration over every cell.
    pub fn iter_cells(&self) -> impl Iterator<Item = GridIndex> + use<T> {
        let columns = self.columns;
        itertools::iproduct!(0..self.rings, 0..columns)
            .map(|(ring, column)| GridIndex { ring, column })
    }

    /// The 4-neighbourhood of a cell.
    ///
    /// Columns wrap around modulo `columns`, rings do not.
    pub fn neighbours(&self, index: GridIndex) -> impl Iterator<Item = (GridIndex, Axis)> + use<T> {
        let GridIndex { ring, column } = index;
        let columns = self.columns;

        let lower = ring.checked_sub(1);
        let upper = (ring + 1 < self.rings).then_some(ring + 1);
        let left = (column + columns - 1) % columns;
        let right = (column + 1) % columns;

        let ring_neighbours = [lower, upper]
            .into_iter()
            .flatten()
            .map(move |ring| (GridIndex { ring, column }, Axis::Ring));
        let column_neighbours = [left, right]
            .into_iter()
            .filter(move |&c| c != column)
            .map(move |column| (GridIndex { ring, column }, Axis::Column));

        ring_neighbours.chain(column_neighbours)
    }
}
