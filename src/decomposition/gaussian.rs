//! Shared pieces of the linear-Gaussian latent model `x = W z + mu + eps`,
//! `z ~ N(0, I)`, `eps ~ N(0, diag(psi))`. PPCA is the special case where
//! every entry of `psi` equals the same `sigma²`.

use crate::error::{LatentError, Result};
use crate::linalg::{inverse, log_det_spd};
use crate::{Matrix, Vector};
use ndarray::Axis;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::StandardNormal;
use rand::Rng;
use std::f64::consts::PI;

/// Marginal covariance `W Wᵀ + diag(psi)`.
pub(crate) fn model_covariance(w: &Matrix, psi: &Vector) -> Matrix {
    w.dot(&w.t()) + Matrix::from_diag(psi)
}

/// Posterior covariance of the latent variables, `G = (I + Wᵀ Psi⁻¹ W)⁻¹`.
/// It is the same for every observation.
pub(crate) fn posterior_covariance(w: &Matrix, psi: &Vector) -> Result<Matrix> {
    let k = w.ncols();
    let psi_inv_w = w / &psi.view().insert_axis(Axis(1));
    inverse(&(Matrix::eye(k) + w.t().dot(&psi_inv_w)))
}

/// Matrix `P = Psi⁻¹ W G` such that the posterior means of the latent
/// variables for centred rows `Xc` are `Xc P`.
pub(crate) fn posterior_projection(w: &Matrix, psi: &Vector) -> Result<Matrix> {
    let g = posterior_covariance(w, psi)?;
    let psi_inv_w = w / &psi.view().insert_axis(Axis(1));
    Ok(psi_inv_w.dot(&g))
}

/// Average log-likelihood from the sample covariance `s` of centred data:
/// `-(d ln 2pi + ln|C| + tr(C⁻¹ S)) / 2`.
pub(crate) fn average_log_likelihood(s: &Matrix, cov: &Matrix) -> Result<f64> {
    let d = cov.nrows() as f64;
    let log_det = log_det_spd(cov)?;
    let precision = inverse(cov)?;
    let trace = (&precision * s).sum();
    Ok(-0.5 * (d * (2.0 * PI).ln() + log_det + trace))
}

/// Draws `n_samples` observations from the generative model.
pub(crate) fn sample<R: Rng + ?Sized>(
    w: &Matrix,
    psi: &Vector,
    mean: &Vector,
    n_samples: usize,
    rng: &mut R,
) -> Matrix {
    let (d, k) = w.dim();
    let z = Matrix::random_using((n_samples, k), StandardNormal, rng);
    let noise = Matrix::random_using((n_samples, d), StandardNormal, rng)
        * &psi.mapv(f64::sqrt).view().insert_axis(Axis(0));
    z.dot(&w.t()) + noise + &mean.view().insert_axis(Axis(0))
}

pub(crate) fn check_input(x: &Matrix) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(LatentError::EmptyInput);
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(LatentError::NonFinite("X"));
    }
    Ok(())
}

pub(crate) fn check_features(x: &Matrix, mean: &Vector) -> Result<()> {
    if x.ncols() != mean.len() {
        return Err(LatentError::DimensionMismatch {
            found: x.ncols(),
            expected: mean.len(),
            expected_what: "training data",
        });
    }
    Ok(())
}

pub(crate) fn check_latent(z: &Matrix, w: &Matrix) -> Result<()> {
    if z.ncols() != w.ncols() {
        return Err(LatentError::DimensionMismatch {
            found: z.ncols(),
            expected: w.ncols(),
            expected_what: "number of components",
        });
    }
    Ok(())
}
