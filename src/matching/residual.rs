//! Point-to-line and point-to-plane distances with their gradients.

use nalgebra::{Point3, Vector3};

use crate::utils::Real;

/// A residual value and its gradient with respect to the transformed point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual<T: Real> {
    pub value: T,
    pub gradient: Vector3<T>,
    pub degenerate: bool,
}

impl<T: Real> Residual<T> {
    /// A zero row, reported as degenerate.
    pub fn degenerate() -> Self {
        Self {
            value: T::zero(),
            gradient: Vector3::zeros(),
            degenerate: true,
        }
    }

    /// Zeroes whatever is non-finite and flags it.
    fn sanitized(self) -> Self {
        let value_finite = self.value.is_finite();
        let gradient_finite = self.gradient.iter().all(|g| g.is_finite());
        if value_finite && gradient_finite {
            return self;
        }
        Self {
            value: if value_finite { self.value } else { T::zero() },
            gradient: if gradient_finite {
                self.gradient
            } else {
                Vector3::zeros()
            },
            degenerate: true,
        }
    }
}

/// Distance from `point` to the line through `a` and `b`.
pub fn point_to_line<T: Real>(
    point: &Point3<T>,
    a: &Point3<T>,
    b: &Point3<T>,
    epsilon: T,
) -> Residual<T> {
    let direction = a - b;
    let length = direction.norm();
    if length <= epsilon || !length.is_finite() {
        return Residual::degenerate();
    }

    let cross = (point - a).cross(&(point - b));
    let area = cross.norm();
    let value = area / length;
    // On the line the distance has no defined gradient.
    let gradient = if area > epsilon {
        direction.cross(&cross) / (area * length)
    } else {
        Vector3::zeros()
    };

    Residual {
        value,
        gradient,
        degenerate: false,
    }
    .sanitized()
}

/// Signed distance from `point` to the plane through `a`, `b` and `c`,
/// positive on the side the normal `(a - b) x (a - c)` points away from.
pub fn point_to_plane<T: Real>(
    point: &Point3<T>,
    a: &Point3<T>,
    b: &Point3<T>,
    c: &Point3<T>,
    epsilon: T,
) -> Residual<T> {
    let normal = (a - b).cross(&(a - c));
    let norm = normal.norm();
    if norm <= epsilon || !norm.is_finite() {
        return Residual::degenerate();
    }

    let unit = normal / norm;
    Residual {
        value: (a - point).dot(&unit),
        gradient: -unit,
        degenerate: false,
    }
    .sanitized()
}
