use crate::error::{LatentError, Result};
use crate::linalg::{inverse, log_det_spd, orthonormalize, symmetric_eigen};
use crate::{Matrix, Vector};
use std::f64::consts::PI;

pub fn mean_squared_error(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(LatentError::DimensionMismatch {
            found: y_pred.len(),
            expected: y_true.len(),
            expected_what: "y_true length",
        });
    }

    let diff = y_true - y_pred;
    diff.mapv(|x| x * x).mean().ok_or(LatentError::EmptyInput)
}

pub fn mean_absolute_error(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(LatentError::DimensionMismatch {
            found: y_pred.len(),
            expected: y_true.len(),
            expected_what: "y_true length",
        });
    }

    let diff = y_true - y_pred;
    diff.mapv(|x| x.abs()).mean().ok_or(LatentError::EmptyInput)
}

/// Mean squared error over every entry of a reconstructed data matrix.
pub fn reconstruction_error(x: &Matrix, x_hat: &Matrix) -> Result<f64> {
    if x.dim() != x_hat.dim() {
        return Err(LatentError::ShapeMismatch {
            found: x_hat.dim(),
            expected: x.dim(),
            expected_what: "original data",
        });
    }

    let diff = x - x_hat;
    diff.mapv(|v| v * v).mean().ok_or(LatentError::EmptyInput)
}

/// Per-row log-density of centred data under `N(0, cov)`.
pub fn gaussian_log_likelihood(x_centered: &Matrix, cov: &Matrix) -> Result<Vector> {
    let d = cov.nrows();
    if x_centered.ncols() != d {
        return Err(LatentError::DimensionMismatch {
            found: x_centered.ncols(),
            expected: d,
            expected_what: "covariance size",
        });
    }

    let log_det = log_det_spd(cov)?;
    let precision = inverse(cov)?;
    let norm = d as f64 * (2.0 * PI).ln() + log_det;

    let quad = (x_centered.dot(&precision) * x_centered).sum_axis(ndarray::Axis(1));
    Ok(quad.mapv(|q| -0.5 * (norm + q)))
}

/// Frobenius norm of `a - b`.
pub fn covariance_error(a: &Matrix, b: &Matrix) -> Result<f64> {
    if a.dim() != b.dim() {
        return Err(LatentError::ShapeMismatch {
            found: b.dim(),
            expected: a.dim(),
            expected_what: "reference covariance",
        });
    }

    Ok((a - b).mapv(|v| v * v).sum().sqrt())
}

/// Sine of the largest principal angle between the column spaces of two
/// loading matrices. Zero means the spaces coincide; the value does not
/// change under any rotation of the latent coordinates.
pub fn subspace_distance(a: &Matrix, b: &Matrix) -> Result<f64> {
    if a.dim() != b.dim() {
        return Err(LatentError::ShapeMismatch {
            found: b.dim(),
            expected: a.dim(),
            expected_what: "reference loadings",
        });
    }

    let qa = orthonormalize(a)?;
    let qb = orthonormalize(b)?;
    let overlap = qa.t().dot(&qb);

    // Squared cosines of the principal angles.
    let (cos2, _) = symmetric_eigen(&overlap.t().dot(&overlap))?;
    let min_cos2 = cos2.iter().cloned().fold(f64::INFINITY, f64::min).clamp(0.0, 1.0);

    Ok((1.0 - min_cos2).sqrt())
}
