use nalgebra::DMatrix;
use ssm_core::{Error, Result};

/// Natural log of `2*pi` as an f64 constant.
///
/// We keep this as a literal because `ln()` is not a `const fn` on stable Rust.
pub(crate) const LN_2PI: f64 = 1.837_877_066_409_345_3;

#[inline]
pub(crate) fn symmetrize(p: &DMatrix<f64>) -> DMatrix<f64> {
    0.5 * (p + p.transpose())
}

/// Symmetry check up to floating-point tolerance.
pub(crate) fn is_symmetric(m: &DMatrix<f64>, tol: f64) -> bool {
    let n = m.nrows();
    if m.ncols() != n {
        return false;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if (m[(i, j)] - m[(j, i)]).abs() > tol {
                return false;
            }
        }
    }
    true
}

/// Solve-based inverse of a symmetric positive-definite matrix.
///
/// Goes through a Cholesky factorization rather than a general inverse; the
/// result is re-symmetrized to cancel round-off asymmetry.
pub(crate) fn spd_inverse(m: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>> {
    let chol = m
        .clone()
        .cholesky()
        .ok_or_else(|| Error::numerical(format!("{context}: matrix not SPD")))?;
    Ok(symmetrize(&chol.inverse()))
}
