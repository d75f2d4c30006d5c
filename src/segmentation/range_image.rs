use nalgebra::Scalar;

use crate::{
    geometry::{GridIndex, SensorGeometry},
    point::ScanPoint,
    utils::Real,
};

/// An occupied cell of the range grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeCell<T> {
    pub range: T,
    /// Index of the point in the scan it was projected from.
    pub point: usize,
}

/// Why a point did not make it into the grid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DroppedPoints {
    pub too_close: usize,
    pub out_of_grid: usize,
    /// Returns that landed in a cell already taken by a later point.
    pub overwritten: usize,
}

impl DroppedPoints {
    #[inline]
    pub const fn total(&self) -> usize {
        self.too_close + self.out_of_grid + self.overwritten
    }
}

/// The `rings x columns` grid of ranges for one scan.
#[derive(Debug, Clone)]
pub struct RangeImage<T: Scalar> {
    geometry: SensorGeometry<T>,
    cells: Vec<Option<RangeCell<T>>>,
    point_cells: Vec<Option<GridIndex>>,
    dropped: DroppedPoints,
}

impl<T: Real> RangeImage<T> {
    /// Writes every point at least `min_range` away into its `(ring, column)` cell.
    ///
    /// When two points share a cell the later one wins.
    pub fn project(points: &[ScanPoint<T>], geometry: &SensorGeometry<T>, min_range: T) -> Self {
        let mut cells = vec![None; geometry.cells()];
        let mut point_cells = vec![None; points.len()];
        let mut dropped = DroppedPoints::default();

        for (point_index, point) in points.iter().enumerate() {
            let range = point.range();
            if !range.is_finite() || range < min_range {
                dropped.too_close += 1;
                continue;
            }
            let Some(index) = geometry.grid_index(point.ring, point.column) else {
                dropped.out_of_grid += 1;
                continue;
            };
            let flat = geometry.flat(index);
            if let Some(previous) = cells[flat].replace(RangeCell {
                range,
                point: point_index,
            }) {
                point_cells[previous.point] = None;
                dropped.overwritten += 1;
            }
            point_cells[point_index] = Some(index);
        }

        if dropped.total() > 0 {
            tracing::debug!(
                too_close = dropped.too_close,
                out_of_grid = dropped.out_of_grid,
                overwritten = dropped.overwritten,
                "points left out of the range image"
            );
        }

        Self {
            geometry: geometry.clone(),
            cells,
            point_cells,
            dropped,
        }
    }

    #[inline]
    pub fn geometry(&self) -> &SensorGeometry<T> {
        &self.geometry
    }

    #[inline]
    pub fn get(&self, index: GridIndex) -> Option<&RangeCell<T>> {
        self.cells.get(self.geometry.flat(index))?.as_ref()
    }

    #[inline]
    pub fn range(&self, index: GridIndex) -> Option<T> {
        self.get(index).map(|cell| cell.range)
    }

    /// The cell a point was written to, `None` if it was dropped.
    #[inline]
    pub fn cell_of(&self, point: usize) -> Option<GridIndex> {
        self.point_cells.get(point).copied().flatten()
    }

    pub fn occupied(&self) -> usize {
        self.cells.iter().flatten().count()
    }

    #[inline]
    pub fn dropped(&self) -> DroppedPoints {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Point3;

    use super::*;

    fn geometry() -> SensorGeometry<f64> {
        SensorGeometry {
            rings: 4,
            columns: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_drops_close_and_out_of_grid_points() {
        let points = [
            ScanPoint::new(Point3::new(5.0, 0.0, 0.0), 1, 2),
            ScanPoint::new(Point3::new(0.5, 0.0, 0.0), 1, 3),
            ScanPoint::new(Point3::new(5.0, 0.0, 0.0), 4, 3),
            ScanPoint::new(Point3::new(5.0, 0.0, 0.0), 0, 8),
        ];
        let image = RangeImage::project(&points, &geometry(), 1.0);

        assert_eq!(image.cell_of(0), Some(GridIndex::new(1, 2)));
        assert_eq!(image.range(GridIndex::new(1, 2)), Some(5.0));
        assert!((1..4).all(|point| image.cell_of(point).is_none()));
        assert_eq!(image.occupied(), 1);
        assert_eq!(
            image.dropped(),
            DroppedPoints {
                too_close: 1,
                out_of_grid: 2,
                overwritten: 0
            }
        );
    }

    #[test]
    fn test_last_writer_wins() {
        let points = [
            ScanPoint::new(Point3::new(3.0, 0.0, 0.0), 2, 5),
            ScanPoint::new(Point3::new(0.0, 4.0, 0.0), 2, 5),
        ];
        let image = RangeImage::project(&points, &geometry(), 1.0);

        let cell = image.get(GridIndex::new(2, 5)).copied();
        assert_eq!(cell, Some(RangeCell { range: 4.0, point: 1 }));
        assert_eq!(image.cell_of(0), None);
        assert_eq!(image.dropped().overwritten, 1);
    }
}
