use nalgebra::RealField;
use num_traits::float::FloatCore;

/// The scalar bound shared by every numeric stage of the pipeline.
///
/// Implemented for `f32` and `f64`.
pub trait Real: RealField + ToRadians + Copy {}

impl<T: RealField + ToRadians + Copy> Real for T {}

pub trait ToRadians {
    fn to_radians(self) -> Self;
}

impl<T: FloatCore> ToRadians for T {
    #[inline(always)]
    fn to_radians(self) -> Self {
        <T as FloatCore>::to_radians(self)
    }
}

pub trait CollectTo: Iterator {
    fn collect_to<T>(self, collection: &mut T) -> &mut T
    where
        T: Extend<Self::Item>;
}

impl<I: Iterator> CollectTo for I {
    fn collect_to<T: Extend<I::Item>>(self, collection: &mut T) -> &mut T {
        collection.extend(self);
        collection
    }
}

/// Returns `(larger, smaller)`.
#[inline]
pub fn max_min<T: Real>(a: T, b: T) -> (T, T) {
    if a >= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_radians_generic() {
        fn half_turn<T: Real>(degrees: T) -> T {
            degrees.to_radians()
        }
        assert!((half_turn(180.0_f64) - std::f64::consts::PI).abs() < 1e-12);
        assert!((half_turn(180.0_f32) - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn test_collect_to_keeps_existing() {
        let mut buffer = vec![1, 2];
        (3..5).collect_to(&mut buffer);
        assert_eq!(buffer, [1, 2, 3, 4]);
    }

    #[test]
    fn test_max_min() {
        assert_eq!(max_min(1.0, 2.0), (2.0, 1.0));
        assert_eq!(max_min(3.0, -1.0), (3.0, -1.0));
    }
}
