use nalgebra::{Cholesky, DVector, Dyn, Matrix6, OMatrix, U6, Vector6};

use crate::{
    error::{Error, Result},
    utils::Real,
};

/// Solves `(J^T J + damping * I) step = J^T F`.
///
/// The caller applies the step as `x - step`.
pub fn damped_step<T: Real>(
    jacobian: &OMatrix<T, Dyn, U6>,
    residuals: &DVector<T>,
    damping: T,
) -> Result<Vector6<T>> {
    let normal = jacobian.tr_mul(jacobian) + Matrix6::identity() * damping;
    let gradient = jacobian.tr_mul(residuals);

    if !normal.iter().chain(gradient.iter()).all(|value| value.is_finite()) {
        return Err(Error::SingularNormalMatrix);
    }

    let step = Cholesky::new(normal)
        .ok_or(Error::SingularNormalMatrix)?
        .solve(&gradient);
    if !step.iter().all(|value| value.is_finite()) {
        return Err(Error::SingularNormalMatrix);
    }
    Ok(step)
}
