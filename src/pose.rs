//! Six-parameter rigid motion between two sweeps.
//!
//! The rotation is `R = Rx(alpha) * Ry(beta) * Rz(gamma)`, applied before the
//! translation: `p' = R * p + t`.

use nalgebra::{
    Isometry3, Matrix3, Matrix3x6, Point3, Rotation3, Translation3, UnitQuaternion, Vector3,
    Vector6,
};

use crate::{point::Positioned, utils::Real};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose<T> {
    pub alpha: T,
    pub beta: T,
    pub gamma: T,
    pub tx: T,
    pub ty: T,
    pub tz: T,
}

impl<T: Real> Default for Pose<T> {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}

/// Partial derivatives of `Rx * Ry * Rz` with respect to each angle.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationDerivatives<T: Real> {
    pub d_alpha: Matrix3<T>,
    pub d_beta: Matrix3<T>,
    pub d_gamma: Matrix3<T>,
}

impl<T: Real> RotationDerivatives<T> {
    /// `d(R * p + t) / d(alpha, beta, gamma, tx, ty, tz)` for an untransformed point `p`.
    pub fn point_jacobian(&self, point: &Point3<T>) -> Matrix3x6<T> {
        let mut jacobian = Matrix3x6::zeros();
        jacobian.set_column(0, &(self.d_alpha * point.coords));
        jacobian.set_column(1, &(self.d_beta * point.coords));
        jacobian.set_column(2, &(self.d_gamma * point.coords));
        jacobian
            .fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&Matrix3::identity());
        jacobian
    }
}

struct Factors<T> {
    x: Matrix3<T>,
    y: Matrix3<T>,
    z: Matrix3<T>,
    dx: Matrix3<T>,
    dy: Matrix3<T>,
    dz: Matrix3<T>,
}

impl<T: Real> Pose<T> {
    pub fn identity() -> Self {
        Self::new(T::zero(), T::zero(), T::zero(), T::zero(), T::zero(), T::zero())
    }

    pub const fn new(alpha: T, beta: T, gamma: T, tx: T, ty: T, tz: T) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            tx,
            ty,
            tz,
        }
    }

    /// `[alpha, beta, gamma, tx, ty, tz]`
    pub fn from_vector(vector: &Vector6<T>) -> Self {
        Self::new(vector[0], vector[1], vector[2], vector[3], vector[4], vector[5])
    }

    pub fn to_vector(&self) -> Vector6<T> {
        Vector6::new(self.alpha, self.beta, self.gamma, self.tx, self.ty, self.tz)
    }

    #[inline]
    pub fn translation(&self) -> Vector3<T> {
        Vector3::new(self.tx, self.ty, self.tz)
    }

    fn factors(&self) -> Factors<T> {
        let (sa, ca) = self.alpha.sin_cos();
        let (sb, cb) = self.beta.sin_cos();
        let (sg, cg) = self.gamma.sin_cos();
        let (o, l) = (T::zero(), T::one());

        #[rustfmt::skip]
        let factors = Factors {
            x: Matrix3::new(
                l, o, o,
                o, ca, -sa,
                o, sa, ca,
            ),
            y: Matrix3::new(
                cb, o, sb,
                o, l, o,
                -sb, o, cb,
            ),
            z: Matrix3::new(
                cg, -sg, o,
                sg, cg, o,
                o, o, l,
            ),
            dx: Matrix3::new(
                o, o, o,
                o, -sa, -ca,
                o, ca, -sa,
            ),
            dy: Matrix3::new(
                -sb, o, cb,
                o, o, o,
                -cb, o, -sb,
            ),
            dz: Matrix3::new(
                -sg, -cg, o,
                cg, -sg, o,
                o, o, o,
            ),
        };
        factors
    }

    pub fn rotation_matrix(&self) -> Matrix3<T> {
        let Factors { x, y, z, .. } = self.factors();
        x * y * z
    }

    pub fn derivatives(&self) -> RotationDerivatives<T> {
        let Factors { x, y, z, dx, dy, dz } = self.factors();
        RotationDerivatives {
            d_alpha: dx * y * z,
            d_beta: x * dy * z,
            d_gamma: x * y * dz,
        }
    }

    /// Recovers the Euler angles of a rotation matrix built as `Rx * Ry * Rz`.
    ///
    /// `beta` is taken in `[-pi/2, pi/2]`.
    pub fn from_rotation_translation(rotation: &Matrix3<T>, translation: &Vector3<T>) -> Self {
        let beta = rotation[(0, 2)].clamp(-T::one(), T::one()).asin();
        let alpha = (-rotation[(1, 2)]).atan2(rotation[(2, 2)]);
        let gamma = (-rotation[(0, 1)]).atan2(rotation[(0, 0)]);
        Self::new(alpha, beta, gamma, translation.x, translation.y, translation.z)
    }

    #[inline]
    pub fn transform_point(&self, point: &Point3<T>) -> Point3<T> {
        self.rotation_matrix() * point + self.translation()
    }

    /// Moves the 3D part of every point and keeps the rest of it.
    pub fn transform<P, I>(&self, points: I) -> Vec<P>
    where
        P: Positioned<T>,
        I: IntoIterator<Item = P>,
    {
        let rotation = self.rotation_matrix();
        let translation = self.translation();
        points
            .into_iter()
            .map(|point| {
                let moved = rotation * point.position() + translation;
                point.with_position(moved)
            })
            .collect()
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation_matrix().transpose();
        let translation = -(rotation * self.translation());
        Self::from_rotation_translation(&rotation, &translation)
    }

    /// The motion that applies `first` and then `self`.
    pub fn compose(&self, first: &Self) -> Self {
        let rotation = self.rotation_matrix();
        let composed = rotation * first.rotation_matrix();
        let translation = rotation * first.translation() + self.translation();
        Self::from_rotation_translation(&composed, &translation)
    }

    pub fn to_isometry(&self) -> Isometry3<T> {
        let rotation = Rotation3::from_matrix_unchecked(self.rotation_matrix());
        Isometry3::from_parts(
            Translation3::from(self.translation()),
            UnitQuaternion::from_rotation_matrix(&rotation),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.to_vector().iter().all(|value| value.is_finite())
    }
}

/// Free-function form of [`Pose::transform`].
#[inline]
pub fn transform_points<T, P>(points: impl IntoIterator<Item = P>, pose: &Pose<T>) -> Vec<P>
where
    T: Real,
    P: Positioned<T>,
{
    pose.transform(points)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::point::{FeaturePoint, ScanPoint};

    fn random_pose(rng: &mut StdRng) -> Pose<f64> {
        Pose::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
        )
    }

    fn random_point(rng: &mut StdRng) -> Point3<f64> {
        Point3::new(
            rng.random_range(-20.0..20.0),
            rng.random_range(-20.0..20.0),
            rng.random_range(-3.0..3.0),
        )
    }

    #[test]
    fn test_transform_round_trip() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let pose = random_pose(&mut rng);
            let points: Vec<_> = (0..20)
                .map(|ring| FeaturePoint::new(random_point(&mut rng), ring))
                .collect();

            let moved = pose.transform(points.iter().cloned());
            let back = pose.inverse().transform(moved);

            for (original, restored) in points.iter().zip(&back) {
                assert_eq!(original.ring, restored.ring);
                assert_relative_eq!(original.position, restored.position, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_euler_extraction() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let pose = random_pose(&mut rng);
            let recovered =
                Pose::from_rotation_translation(&pose.rotation_matrix(), &pose.translation());
            assert_relative_eq!(pose.to_vector(), recovered.to_vector(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rotation_order() {
        let pose = Pose::new(0.3, -0.2, 0.7, 0.0, 0.0, 0.0);
        let expected = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.3)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), -0.2)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), 0.7);
        assert_relative_eq!(pose.rotation_matrix(), *expected.matrix(), epsilon = 1e-12);
    }

    #[test]
    fn test_compose_matches_sequential_transform() {
        let mut rng = StdRng::seed_from_u64(3);
        let first = random_pose(&mut rng);
        let second = random_pose(&mut rng);
        let point = random_point(&mut rng);

        let sequential = second.transform_point(&first.transform_point(&point));
        let composed = second.compose(&first).transform_point(&point);
        assert_relative_eq!(sequential, composed, epsilon = 1e-9);

        let isometry = second.to_isometry() * first.to_isometry();
        assert_relative_eq!(isometry * point, composed, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_derivatives() {
        let mut rng = StdRng::seed_from_u64(5);
        let h = 1e-6;
        for _ in 0..20 {
            let pose = random_pose(&mut rng);
            let point = random_point(&mut rng);
            let analytic = pose.derivatives().point_jacobian(&point);

            for parameter in 0..6 {
                let mut plus = pose.to_vector();
                let mut minus = pose.to_vector();
                plus[parameter] += h;
                minus[parameter] -= h;
                let numeric = (Pose::from_vector(&plus).transform_point(&point)
                    - Pose::from_vector(&minus).transform_point(&point))
                    / (2.0 * h);
                assert_relative_eq!(
                    analytic.column(parameter).into_owned(),
                    numeric,
                    max_relative = 1e-4,
                    epsilon = 1e-6
                );
            }
        }
    }

    #[test]
    fn test_transform_points_keeps_labels() {
        let pose = Pose::new(0.0, 0.0, std::f64::consts::FRAC_PI_2, 1.0, 0.0, 0.0);
        let scan = [
            ScanPoint::new(Point3::new(1.0, 0.0, 0.0), 3, 7).with_intensity(0.5),
            ScanPoint::new(Point3::new(0.0, 2.0, 1.0), 4, 8),
        ];

        let moved = transform_points(scan.iter().cloned(), &pose);
        assert_relative_eq!(moved[0].position, Point3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(moved[1].position, Point3::new(-1.0, 0.0, 1.0), epsilon = 1e-12);
        assert_eq!((moved[0].ring, moved[0].column, moved[0].intensity), (3, 7, Some(0.5)));
        assert_eq!((moved[1].ring, moved[1].column, moved[1].intensity), (4, 8, None));
        assert_eq!(moved, pose.transform(scan));
    }
}
