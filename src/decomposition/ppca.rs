use super::gaussian;
use crate::error::{LatentError, Result};
use crate::linalg::{center, covariance, inverse, symmetric_eigen};
use crate::metrics::gaussian_log_likelihood;
use crate::{Matrix, Vector};
use ndarray::s;
use rand::Rng;

/// Probabilistic PCA fitted in closed form (Tipping & Bishop, 1999).
///
/// The model is `x = W z + mu + eps` with `z ~ N(0, I)` and isotropic noise
/// `eps ~ N(0, sigma² I)`. The maximum-likelihood solution comes straight out
/// of the eigendecomposition of the sample covariance: `sigma²` is the mean of
/// the discarded eigenvalues and `W = U_k (L_k - sigma² I)^{1/2}`.
#[derive(Clone, Debug)]
pub struct PPCA {
    /// Loading matrix `W`, shape (n_features, n_components).
    pub components: Option<Matrix>,
    /// Isotropic noise variance `sigma²`.
    pub noise_variance: Option<f64>,
    /// Leading eigenvalues of the sample covariance.
    pub explained_variance: Option<Vector>,
    pub mean: Option<Vector>,
    n_components: usize,
    min_noise_variance: f64,
}

impl PPCA {
    pub fn new(n_components: usize) -> Self {
        if n_components == 0 {
            panic!("n_components must be > 0, got {}", n_components);
        }

        Self {
            components: None,
            noise_variance: None,
            explained_variance: None,
            mean: None,
            n_components,
            min_noise_variance: 1e-9,
        }
    }

    /// Lower bound for `sigma²`. Needed when `n_components` equals the number
    /// of features, where the maximum-likelihood noise would be zero.
    pub fn min_noise_variance(mut self, min_noise_variance: f64) -> Self {
        if !(min_noise_variance > 0.0) {
            panic!("min_noise_variance must be positive, got {}", min_noise_variance);
        }
        self.min_noise_variance = min_noise_variance;
        self
    }

    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        gaussian::check_input(x)?;

        let (n_samples, n_features) = x.dim();
        let k = self.n_components;
        if k > n_features {
            return Err(LatentError::InvalidComponents {
                requested: k,
                available: n_features,
            });
        }
        if n_samples < 2 {
            return Err(LatentError::InvalidConfig(
                "PPCA needs at least two samples".to_string(),
            ));
        }

        let (x_centered, mean) = center(x)?;
        let (eigenvalues, eigenvectors) = symmetric_eigen(&covariance(&x_centered))?;

        let discarded = eigenvalues.slice(s![k..]);
        let ml_noise = discarded.mean().unwrap_or(0.0);
        let noise_variance = if ml_noise < self.min_noise_variance {
            if k < n_features {
                log::warn!(
                    "PPCA noise variance {:.3e} clamped to {:.3e}",
                    ml_noise,
                    self.min_noise_variance
                );
            }
            self.min_noise_variance
        } else {
            ml_noise
        };

        let mut components = Matrix::zeros((n_features, k));
        for i in 0..k {
            let scale = (eigenvalues[i] - noise_variance).max(0.0).sqrt();
            components
                .column_mut(i)
                .assign(&(&eigenvectors.column(i) * scale));
        }

        log::info!(
            "PPCA fitted: {} samples, {} features, {} components, sigma^2={:.6}",
            n_samples,
            n_features,
            k,
            noise_variance
        );

        self.explained_variance = Some(eigenvalues.slice(s![..k]).to_owned());
        self.components = Some(components);
        self.noise_variance = Some(noise_variance);
        self.mean = Some(mean);

        Ok(())
    }

    fn fitted(&self) -> Result<(&Matrix, f64, &Vector)> {
        match (&self.components, self.noise_variance, &self.mean) {
            (Some(w), Some(sigma2), Some(mean)) => Ok((w, sigma2, mean)),
            _ => Err(LatentError::NotFitted("PPCA")),
        }
    }

    fn noise_diagonal(&self) -> Result<Vector> {
        let (w, sigma2, _) = self.fitted()?;
        Ok(Vector::from_elem(w.nrows(), sigma2))
    }

    /// Posterior means `E[z | x]` of the latent variables.
    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let (w, _, mean) = self.fitted()?;
        gaussian::check_features(x, mean)?;

        let projection = gaussian::posterior_projection(w, &self.noise_diagonal()?)?;
        let x_centered = x - &mean.view().insert_axis(ndarray::Axis(0));
        Ok(x_centered.dot(&projection))
    }

    pub fn fit_transform(&mut self, x: &Matrix) -> Result<Matrix> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Maps latent coordinates back to the observed space: `z Wᵀ + mu`.
    pub fn inverse_transform(&self, z: &Matrix) -> Result<Matrix> {
        let (w, _, mean) = self.fitted()?;
        gaussian::check_latent(z, w)?;

        Ok(z.dot(&w.t()) + &mean.view().insert_axis(ndarray::Axis(0)))
    }

    pub fn reconstruct(&self, x: &Matrix) -> Result<Matrix> {
        let z = self.transform(x)?;
        self.inverse_transform(&z)
    }

    /// Posterior covariance of the latent variables, shared by all samples.
    pub fn posterior_covariance(&self) -> Result<Matrix> {
        let (w, _, _) = self.fitted()?;
        gaussian::posterior_covariance(w, &self.noise_diagonal()?)
    }

    /// Model covariance `W Wᵀ + sigma² I`.
    pub fn get_covariance(&self) -> Result<Matrix> {
        let (w, _, _) = self.fitted()?;
        Ok(gaussian::model_covariance(w, &self.noise_diagonal()?))
    }

    pub fn get_precision(&self) -> Result<Matrix> {
        inverse(&self.get_covariance()?)
    }

    /// Log-likelihood of each sample under the fitted model.
    pub fn score_samples(&self, x: &Matrix) -> Result<Vector> {
        let (_, _, mean) = self.fitted()?;
        gaussian::check_features(x, mean)?;

        let x_centered = x - &mean.view().insert_axis(ndarray::Axis(0));
        gaussian_log_likelihood(&x_centered, &self.get_covariance()?)
    }

    /// Average log-likelihood of the samples.
    pub fn score(&self, x: &Matrix) -> Result<f64> {
        self.score_samples(x)?.mean().ok_or(LatentError::EmptyInput)
    }

    /// Draws new observations from the fitted generative model.
    pub fn sample<R: Rng + ?Sized>(&self, n_samples: usize, rng: &mut R) -> Result<Matrix> {
        let (w, _, mean) = self.fitted()?;
        Ok(gaussian::sample(w, &self.noise_diagonal()?, mean, n_samples, rng))
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }
}
