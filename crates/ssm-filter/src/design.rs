//! Design-matrix packing for the regression view of a state-space model.
//!
//! Regression covariates enter the filter as per-step observation matrices:
//! step `t` observes `y_t = H_t theta + v_t` with `H_t` a single row of the
//! design matrix. These helpers build the per-step rows from raw covariate
//! rows, and the stacked `T x p` design matrix the batch solver consumes.

use nalgebra::DMatrix;
use ssm_core::{Error, Result};

/// Build one `1 x p` observation matrix per covariate row.
///
/// With `include_intercept`, a leading constant-1 column is prepended, so
/// `p = xs[0].len() + 1`. Rows must be rectangular and finite.
pub fn design_rows(xs: &[Vec<f64>], include_intercept: bool) -> Result<Vec<DMatrix<f64>>> {
    if xs.is_empty() {
        return Err(Error::Validation("covariate rows must be non-empty".to_string()));
    }
    let k = xs[0].len();
    if k == 0 && !include_intercept {
        return Err(Error::Validation(
            "covariate rows must have at least 1 column (or include an intercept)".to_string(),
        ));
    }

    let p = k + usize::from(include_intercept);
    let mut rows = Vec::with_capacity(xs.len());
    for (i, x) in xs.iter().enumerate() {
        if x.len() != k {
            return Err(Error::DimensionMismatch(format!(
                "covariates must be rectangular: row {} has len {}, expected {}",
                i,
                x.len(),
                k
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::Validation(format!("covariate row {} must be finite", i)));
        }

        let mut h = DMatrix::<f64>::zeros(1, p);
        let mut j = 0;
        if include_intercept {
            h[(0, 0)] = 1.0;
            j = 1;
        }
        for &v in x {
            h[(0, j)] = v;
            j += 1;
        }
        rows.push(h);
    }
    Ok(rows)
}

/// Stack per-step `1 x p` observation matrices into a `T x p` design matrix.
pub fn stack_design(rows: &[DMatrix<f64>]) -> Result<DMatrix<f64>> {
    if rows.is_empty() {
        return Err(Error::Validation("rows must be non-empty".to_string()));
    }
    let p = rows[0].ncols();
    for (t, h) in rows.iter().enumerate() {
        if h.nrows() != 1 || h.ncols() != p {
            return Err(Error::DimensionMismatch(format!(
                "rows[{}] must be 1 x {}, got {} x {}",
                t,
                p,
                h.nrows(),
                h.ncols()
            )));
        }
    }

    let mut x = DMatrix::<f64>::zeros(rows.len(), p);
    for (t, h) in rows.iter().enumerate() {
        for j in 0..p {
            x[(t, j)] = h[(0, j)];
        }
    }
    Ok(x)
}
