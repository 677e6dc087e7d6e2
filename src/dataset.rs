use crate::error::{LatentError, Result};
use crate::{Matrix, Vector, seeded_rng};
use ndarray::{Axis, array};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::StandardNormal;

/// Observations drawn from a known linear-Gaussian latent structure,
/// together with the ground truth that produced them.
#[derive(Clone, Debug)]
pub struct LatentDataset {
    /// Latent samples, shape (n_samples, n_latent).
    pub latent: Matrix,
    /// True loading matrix, shape (n_features, n_latent).
    pub loadings: Matrix,
    /// Per-feature noise standard deviation.
    pub noise_std: Vector,
    /// Observed data, shape (n_samples, n_features).
    pub observed: Matrix,
}

impl LatentDataset {
    pub fn n_samples(&self) -> usize {
        self.observed.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.observed.ncols()
    }

    pub fn n_latent(&self) -> usize {
        self.latent.ncols()
    }

    /// Population covariance of the observations: `W Wᵀ + diag(s²)`.
    pub fn true_covariance(&self) -> Matrix {
        let noise = Matrix::from_diag(&self.noise_std.mapv(|s| s * s));
        self.loadings.dot(&self.loadings.t()) + noise
    }
}

/// Builder for synthetic datasets: `x = z Wᵀ + eps` with `z ~ N(0, I)` and
/// `eps_j ~ N(0, s_j²)`.
#[derive(Clone, Debug)]
pub struct LatentGenerator {
    n_samples: usize,
    loadings: Matrix,
    noise_std: Vector,
    random_state: Option<u64>,
}

impl LatentGenerator {
    /// Three observed features driven by two latent factors, each feature
    /// with its own noise level.
    pub fn new() -> Self {
        Self {
            n_samples: 500,
            loadings: array![[2.0, 0.0], [1.0, 1.5], [0.5, -1.0]],
            noise_std: array![0.1, 0.4, 0.8],
            random_state: None,
        }
    }

    pub fn n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    pub fn loadings(mut self, loadings: Matrix) -> Self {
        self.loadings = loadings;
        self
    }

    pub fn noise_std(mut self, noise_std: Vector) -> Self {
        self.noise_std = noise_std;
        self
    }

    pub fn random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    pub fn generate(&self) -> Result<LatentDataset> {
        if self.n_samples == 0 {
            return Err(LatentError::InvalidConfig("n_samples must be > 0".to_string()));
        }

        let (n_features, n_latent) = self.loadings.dim();
        if n_features == 0 || n_latent == 0 {
            return Err(LatentError::EmptyInput);
        }
        if self.loadings.iter().any(|v| !v.is_finite()) {
            return Err(LatentError::NonFinite("loadings"));
        }

        if self.noise_std.len() != n_features {
            return Err(LatentError::DimensionMismatch {
                found: self.noise_std.len(),
                expected: n_features,
                expected_what: "loadings rows",
            });
        }
        if self.noise_std.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(LatentError::InvalidConfig(
                "noise_std entries must be finite and non-negative".to_string(),
            ));
        }

        let mut rng = seeded_rng(self.random_state);

        let latent = Matrix::random_using((self.n_samples, n_latent), StandardNormal, &mut rng);
        let noise = Matrix::random_using((self.n_samples, n_features), StandardNormal, &mut rng)
            * &self.noise_std.view().insert_axis(Axis(0));
        let observed = latent.dot(&self.loadings.t()) + noise;

        log::debug!(
            "generated {} samples: {} features from {} latent factors",
            self.n_samples,
            n_features,
            n_latent
        );

        Ok(LatentDataset {
            latent,
            loadings: self.loadings.clone(),
            noise_std: self.noise_std.clone(),
            observed,
        })
    }
}

impl Default for LatentGenerator {
    fn default() -> Self {
        Self::new()
    }
}
