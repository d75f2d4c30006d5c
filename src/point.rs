use nalgebra::{Point3, RealField, Scalar};

/// One return of a rotating multi-ring sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPoint<T: Scalar> {
    pub position: Point3<T>,
    /// Index of the scan line that produced the return.
    pub ring: usize,
    /// Azimuth bin of the return.
    pub column: usize,
    /// Carried along for consumers, never read by the pipeline.
    pub intensity: Option<T>,
}

impl<T: Scalar> ScanPoint<T> {
    pub const fn new(position: Point3<T>, ring: usize, column: usize) -> Self {
        Self {
            position,
            ring,
            column,
            intensity: None,
        }
    }

    pub fn with_intensity(self, intensity: T) -> Self {
        Self {
            intensity: Some(intensity),
            ..self
        }
    }
}

impl<T: RealField> ScanPoint<T> {
    #[inline]
    pub fn range(&self) -> T {
        self.position.coords.norm()
    }
}

/// An edge or planar feature, keeping the ring it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePoint<T: Scalar> {
    pub position: Point3<T>,
    pub ring: usize,
}

impl<T: Scalar> FeaturePoint<T> {
    pub const fn new(position: Point3<T>, ring: usize) -> Self {
        Self { position, ring }
    }
}

impl<T: Scalar> From<&ScanPoint<T>> for FeaturePoint<T> {
    fn from(point: &ScanPoint<T>) -> Self {
        Self::new(point.position.clone(), point.ring)
    }
}

/// Anything that can be fed to the pipeline as a scan point.
pub trait LidarPoint<T: Scalar> {
    fn to_scan_point(self) -> ScanPoint<T>;
}

impl<T: Scalar> LidarPoint<T> for ScanPoint<T> {
    #[inline(always)]
    fn to_scan_point(self) -> ScanPoint<T> {
        self
    }
}

impl<T: Scalar> LidarPoint<T> for (Point3<T>, usize, usize) {
    #[inline]
    fn to_scan_point(self) -> ScanPoint<T> {
        ScanPoint::new(self.0, self.1, self.2)
    }
}

impl<T: Scalar> LidarPoint<T> for ([T; 3], usize, usize) {
    #[inline]
    fn to_scan_point(self) -> ScanPoint<T> {
        ScanPoint::new(Point3::from(self.0), self.1, self.2)
    }
}

/// `(x, y, z, intensity)` plus ring and column.
impl<T: Scalar> LidarPoint<T> for ([T; 4], usize, usize) {
    #[inline]
    fn to_scan_point(self) -> ScanPoint<T> {
        let ([x, y, z, intensity], ring, column) = self;
        ScanPoint::new(Point3::new(x, y, z), ring, column).with_intensity(intensity)
    }
}

/// Access to the 3D part of a point, so a pose can move it and keep the rest.
pub trait Positioned<T: Scalar> {
    fn position(&self) -> &Point3<T>;
    fn with_position(self, position: Point3<T>) -> Self;
}

impl<T: Scalar> Positioned<T> for Point3<T> {
    #[inline(always)]
    fn position(&self) -> &Point3<T> {
        self
    }
    #[inline(always)]
    fn with_position(self, position: Point3<T>) -> Self {
        position
    }
}

impl<T: Scalar> Positioned<T> for FeaturePoint<T> {
    #[inline(always)]
    fn position(&self) -> &Point3<T> {
        &self.position
    }
    #[inline]
    fn with_position(self, position: Point3<T>) -> Self {
        Self { position, ..self }
    }
}

impl<T: Scalar> Positioned<T> for ScanPoint<T> {
    #[inline(always)]
    fn position(&self) -> &Point3<T> {
        &self.position
    }
    #[inline]
    fn with_position(self, position: Point3<T>) -> Self {
        Self { position, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lidar_point_conversions() {
        let from_tuple = (Point3::new(1.0, 2.0, 2.0), 3, 7).to_scan_point();
        assert_eq!(from_tuple.ring, 3);
        assert_eq!(from_tuple.column, 7);
        assert_eq!(from_tuple.range(), 3.0);
        assert!(from_tuple.intensity.is_none());

        let from_array = ([1.0, 2.0, 2.0, 42.0], 1, 2).to_scan_point();
        assert_eq!(from_array.intensity, Some(42.0));
        assert_eq!(from_array.position, Point3::new(1.0, 2.0, 2.0));
    }

    #[test]
    fn test_with_position_keeps_ring() {
        let feature = FeaturePoint::new(Point3::new(1.0, 0.0, 0.0), 9);
        let moved = feature.with_position(Point3::new(0.0, 1.0, 0.0));
        assert_eq!(moved.ring, 9);
        assert_eq!(moved.position, Point3::new(0.0, 1.0, 0.0));
    }
}
