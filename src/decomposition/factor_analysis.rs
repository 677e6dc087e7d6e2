use super::gaussian;
use crate::error::{LatentError, Result};
use crate::linalg::{center, covariance, inverse};
use crate::metrics::gaussian_log_likelihood;
use crate::{Matrix, Vector, seeded_rng};
use ndarray::Axis;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::StandardNormal;
use rand::Rng;

/// Factor Analysis fitted by Expectation-Maximization.
///
/// Same linear-Gaussian model as PPCA but with a diagonal noise covariance
/// `Psi`, so each observed feature keeps its own noise variance.
#[derive(Clone, Debug)]
pub struct FactorAnalysis {
    /// Loading matrix `W`, shape (n_features, n_components).
    pub components: Option<Matrix>,
    /// Diagonal of `Psi`, one noise variance per feature.
    pub noise_variance: Option<Vector>,
    pub mean: Option<Vector>,
    /// Average log-likelihood after each EM iteration.
    pub loglike: Vec<f64>,
    /// Number of EM iterations actually run.
    pub n_iter: usize,
    n_components: usize,
    max_iter: usize,
    tol: Option<f64>,
    min_noise_variance: f64,
    random_state: Option<u64>,
}

impl FactorAnalysis {
    pub fn new(n_components: usize) -> Self {
        if n_components == 0 {
            panic!("n_components must be > 0, got {}", n_components);
        }

        Self {
            components: None,
            noise_variance: None,
            mean: None,
            loglike: Vec::new(),
            n_iter: 0,
            n_components,
            max_iter: 100,
            tol: None,
            min_noise_variance: 1e-9,
            random_state: None,
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Stop once an iteration improves the average log-likelihood by less
    /// than `tol`. Without it every one of `max_iter` iterations runs.
    pub fn tol(mut self, tol: f64) -> Self {
        if !(tol >= 0.0) {
            panic!("tol must be non-negative, got {}", tol);
        }
        self.tol = Some(tol);
        self
    }

    pub fn min_noise_variance(mut self, min_noise_variance: f64) -> Self {
        if !(min_noise_variance > 0.0) {
            panic!("min_noise_variance must be positive, got {}", min_noise_variance);
        }
        self.min_noise_variance = min_noise_variance;
        self
    }

    pub fn random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
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
                "FactorAnalysis needs at least two samples".to_string(),
            ));
        }

        let n = n_samples as f64;
        let (x_centered, mean) = center(x)?;
        let s = covariance(&x_centered);
        let sample_var = s.diag().to_owned();

        // Initialize noise with the per-feature variance, loadings at random
        let mut psi = sample_var.mapv(|v| v.max(self.min_noise_variance));
        let init_scale = (sample_var.mean().unwrap_or(1.0) / k as f64).sqrt();
        let mut rng = seeded_rng(self.random_state);
        let mut w = Matrix::random_using((n_features, k), StandardNormal, &mut rng) * init_scale;

        let mut loglike = Vec::with_capacity(self.max_iter);
        let mut n_iter = 0;

        for iteration in 0..self.max_iter {
            // E-step: posterior moments of z for every sample
            let g = gaussian::posterior_covariance(&w, &psi)?;
            let psi_inv_w = &w / &psi.view().insert_axis(Axis(1));
            let ez = x_centered.dot(&psi_inv_w).dot(&g);
            let szz = &g * n + ez.t().dot(&ez);

            // M-step
            let xez = x_centered.t().dot(&ez);
            w = xez.dot(&inverse(&szz)?);

            let explained = (&w * &xez).sum_axis(Axis(1)) / n;
            let mut clamped = 0;
            psi = (&sample_var - &explained).mapv(|v| {
                if v < self.min_noise_variance {
                    clamped += 1;
                    self.min_noise_variance
                } else {
                    v
                }
            });
            if clamped > 0 {
                log::warn!(
                    "iteration {}: {} noise variance(s) clamped to {:.3e}",
                    iteration,
                    clamped,
                    self.min_noise_variance
                );
            }

            let ll = gaussian::average_log_likelihood(&s, &gaussian::model_covariance(&w, &psi))?;
            log::debug!("FA iteration {}: log-likelihood {:.8}", iteration, ll);

            let gain = loglike.last().map(|prev: &f64| ll - prev);
            loglike.push(ll);
            n_iter = iteration + 1;

            if let Some(gain) = gain {
                if gain < -1e-8 * ll.abs().max(1.0) {
                    log::warn!("FA log-likelihood decreased by {:.3e} at iteration {}", -gain, iteration);
                }
                if let Some(tol) = self.tol {
                    if gain.abs() < tol {
                        break;
                    }
                }
            }
        }

        log::info!(
            "FactorAnalysis fitted: {} samples, {} features, {} components, {} iterations, log-likelihood {:.6}",
            n_samples,
            n_features,
            k,
            n_iter,
            loglike.last().copied().unwrap_or(f64::NAN)
        );

        self.components = Some(w);
        self.noise_variance = Some(psi);
        self.mean = Some(mean);
        self.loglike = loglike;
        self.n_iter = n_iter;

        Ok(())
    }

    fn fitted(&self) -> Result<(&Matrix, &Vector, &Vector)> {
        match (&self.components, &self.noise_variance, &self.mean) {
            (Some(w), Some(psi), Some(mean)) => Ok((w, psi, mean)),
            _ => Err(LatentError::NotFitted("FactorAnalysis")),
        }
    }

    /// Posterior means `E[z | x] = G Wᵀ Psi⁻¹ (x - mu)`.
    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let (w, psi, mean) = self.fitted()?;
        gaussian::check_features(x, mean)?;

        let projection = gaussian::posterior_projection(w, psi)?;
        let x_centered = x - &mean.view().insert_axis(Axis(0));
        Ok(x_centered.dot(&projection))
    }

    pub fn fit_transform(&mut self, x: &Matrix) -> Result<Matrix> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn inverse_transform(&self, z: &Matrix) -> Result<Matrix> {
        let (w, _, mean) = self.fitted()?;
        gaussian::check_latent(z, w)?;

        Ok(z.dot(&w.t()) + &mean.view().insert_axis(Axis(0)))
    }

    pub fn reconstruct(&self, x: &Matrix) -> Result<Matrix> {
        let z = self.transform(x)?;
        self.inverse_transform(&z)
    }

    pub fn posterior_covariance(&self) -> Result<Matrix> {
        let (w, psi, _) = self.fitted()?;
        gaussian::posterior_covariance(w, psi)
    }

    /// Model covariance `W Wᵀ + Psi`.
    pub fn get_covariance(&self) -> Result<Matrix> {
        let (w, psi, _) = self.fitted()?;
        Ok(gaussian::model_covariance(w, psi))
    }

    pub fn get_precision(&self) -> Result<Matrix> {
        inverse(&self.get_covariance()?)
    }

    pub fn score_samples(&self, x: &Matrix) -> Result<Vector> {
        let (_, _, mean) = self.fitted()?;
        gaussian::check_features(x, mean)?;

        let x_centered = x - &mean.view().insert_axis(Axis(0));
        gaussian_log_likelihood(&x_centered, &self.get_covariance()?)
    }

    pub fn score(&self, x: &Matrix) -> Result<f64> {
        self.score_samples(x)?.mean().ok_or(LatentError::EmptyInput)
    }

    pub fn sample<R: Rng + ?Sized>(&self, n_samples: usize, rng: &mut R) -> Result<Matrix> {
        let (w, psi, mean) = self.fitted()?;
        Ok(gaussian::sample(w, psi, mean, n_samples, rng))
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::LatentGenerator;
    use crate::decomposition::PPCA;
    use crate::linalg::cholesky;
    use crate::metrics::{covariance_error, subspace_distance};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // Six features and two factors: few enough parameters for the loadings
    // and noise variances to be identifiable.
    fn heteroscedastic_data() -> crate::LatentDataset {
        LatentGenerator::new()
            .n_samples(5000)
            .loadings(array![
                [1.0, 0.0],
                [0.8, 0.6],
                [0.0, 1.0],
                [1.2, -0.5],
                [0.5, 0.9],
                [-0.7, 0.4]
            ])
            .noise_std(array![0.2, 0.3, 0.4, 0.5, 0.6, 0.7])
            .random_state(42)
            .generate()
            .unwrap()
    }

    #[test]
    fn test_fa_basic() {
        let data = LatentGenerator::new().n_samples(500).random_state(0).generate().unwrap();
        let mut fa = FactorAnalysis::new(2).random_state(0);
        let z = fa.fit_transform(&data.observed).unwrap();

        assert_eq!(z.shape(), &[500, 2]);
        assert_eq!(fa.components.as_ref().unwrap().shape(), &[3, 2]);
        assert_eq!(fa.noise_variance.as_ref().unwrap().len(), 3);
        assert!(fa.noise_variance.as_ref().unwrap().iter().all(|&v| v > 0.0));
        assert_eq!(fa.n_iter, 100);
        assert_eq!(fa.loglike.len(), 100);
    }

    #[test]
    fn test_fa_loglike_non_decreasing() {
        let data = heteroscedastic_data();
        let mut fa = FactorAnalysis::new(2).random_state(1);
        fa.fit(&data.observed).unwrap();

        for pair in fa.loglike.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9, "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_fa_recovers_noise_variances() {
        let data = heteroscedastic_data();
        let mut fa = FactorAnalysis::new(2).max_iter(500).random_state(2);
        fa.fit(&data.observed).unwrap();

        let psi = fa.noise_variance.as_ref().unwrap();
        let truth = data.noise_std.mapv(|s| s * s);
        assert_abs_diff_eq!(*psi, truth, epsilon = 0.1);
    }

    #[test]
    fn test_fa_recovers_loading_subspace() {
        let data = heteroscedastic_data();
        let mut fa = FactorAnalysis::new(2).max_iter(500).random_state(3);
        fa.fit(&data.observed).unwrap();

        let w = fa.components.as_ref().unwrap();
        assert!(subspace_distance(w, &data.loadings).unwrap() < 0.1);
    }

    #[test]
    fn test_fa_beats_ppca_on_heteroscedastic_noise() {
        let data = heteroscedastic_data();

        let mut fa = FactorAnalysis::new(2).max_iter(300).random_state(4);
        fa.fit(&data.observed).unwrap();
        let mut ppca = PPCA::new(2);
        ppca.fit(&data.observed).unwrap();

        let fa_score = fa.score(&data.observed).unwrap();
        let ppca_score = ppca.score(&data.observed).unwrap();
        assert!(fa_score > ppca_score, "fa {} <= ppca {}", fa_score, ppca_score);
    }

    #[test]
    fn test_fa_score_matches_last_loglike() {
        let data = heteroscedastic_data();
        let mut fa = FactorAnalysis::new(2).max_iter(20).random_state(5);
        fa.fit(&data.observed).unwrap();

        let score = fa.score(&data.observed).unwrap();
        assert_abs_diff_eq!(score, *fa.loglike.last().unwrap(), epsilon = 1e-8);
    }

    #[test]
    fn test_fa_tolerance_stops_early() {
        let data = heteroscedastic_data();
        let mut fa = FactorAnalysis::new(2).max_iter(1000).tol(1e-6).random_state(6);
        fa.fit(&data.observed).unwrap();

        assert!(fa.n_iter < 1000);
        assert_eq!(fa.loglike.len(), fa.n_iter);
    }

    #[test]
    fn test_fa_same_seed_same_fit() {
        let data = heteroscedastic_data();
        let mut a = FactorAnalysis::new(2).max_iter(10).random_state(9);
        let mut b = FactorAnalysis::new(2).max_iter(10).random_state(9);
        a.fit(&data.observed).unwrap();
        b.fit(&data.observed).unwrap();

        assert_eq!(a.components, b.components);
        assert_eq!(a.noise_variance, b.noise_variance);
    }

    #[test]
    fn test_fa_reconstruction_and_sampling() {
        let data = heteroscedastic_data();
        let mut fa = FactorAnalysis::new(2).random_state(7);
        fa.fit(&data.observed).unwrap();

        let reconstructed = fa.reconstruct(&data.observed).unwrap();
        assert_eq!(reconstructed.shape(), data.observed.shape());

        let mut rng = crate::seeded_rng(Some(1));
        assert_eq!(fa.sample(25, &mut rng).unwrap().shape(), &[25, 6]);

        let posterior = fa.posterior_covariance().unwrap();
        assert_eq!(posterior.shape(), &[2, 2]);
        assert!(posterior[[0, 0]] > 0.0 && posterior[[1, 1]] > 0.0);
    }

    #[test]
    fn test_fa_zero_iterations_keeps_initialization() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [0.0, 0.5], [3.0, 2.5]];
        let mut fa = FactorAnalysis::new(1).max_iter(0).random_state(0);
        fa.fit(&x).unwrap();

        assert_eq!(fa.n_iter, 0);
        assert!(fa.loglike.is_empty());
        assert!(fa.get_covariance().is_ok());
    }

    #[test]
    fn test_fa_not_fitted() {
        let fa = FactorAnalysis::new(1);
        let x = array![[1.0, 2.0]];

        assert_eq!(fa.transform(&x).unwrap_err(), LatentError::NotFitted("FactorAnalysis"));
        assert!(fa.get_covariance().is_err());
    }

    #[test]
    fn test_fa_invalid_components() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let mut fa = FactorAnalysis::new(3);
        assert!(matches!(fa.fit(&x), Err(LatentError::InvalidComponents { .. })));
    }

    #[test]
    fn test_fa_rejects_non_finite_input() {
        let x = array![[1.0, f64::NAN], [3.0, 4.0]];
        let mut fa = FactorAnalysis::new(1);
        assert_eq!(fa.fit(&x).unwrap_err(), LatentError::NonFinite("X"));
    }

    #[test]
    fn test_fa_matches_ppca_on_isotropic_noise() {
        let data = LatentGenerator::new()
            .n_samples(5000)
            .noise_std(array![0.5, 0.5, 0.5])
            .random_state(1)
            .generate()
            .unwrap();

        let mut fa = FactorAnalysis::new(2).max_iter(300).random_state(1);
        fa.fit(&data.observed).unwrap();
        let mut ppca = PPCA::new(2);
        ppca.fit(&data.observed).unwrap();

        let gap = covariance_error(&ppca.get_covariance().unwrap(), &fa.get_covariance().unwrap())
            .unwrap();
        assert!(gap < 1e-3, "covariance gap {}", gap);
    }

    #[test]
    fn test_fa_noise_near_equal_on_isotropic_noise() {
        // Three features with two factors leave the noise split free, so the
        // per-feature comparison needs the identifiable six-feature layout.
        let data = LatentGenerator::new()
            .n_samples(5000)
            .loadings(array![
                [1.0, 0.0],
                [0.8, 0.6],
                [0.0, 1.0],
                [1.2, -0.5],
                [0.5, 0.9],
                [-0.7, 0.4]
            ])
            .noise_std(Vector::from_elem(6, 0.5))
            .random_state(1)
            .generate()
            .unwrap();

        let mut fa = FactorAnalysis::new(2).max_iter(300).random_state(1);
        fa.fit(&data.observed).unwrap();
        let mut ppca = PPCA::new(2);
        ppca.fit(&data.observed).unwrap();

        let psi = fa.noise_variance.as_ref().unwrap();
        let spread = psi.fold(f64::NEG_INFINITY, |m, &v| m.max(v))
            - psi.fold(f64::INFINITY, |m, &v| m.min(v));
        assert!(spread < 0.06, "psi = {:?}", psi);

        let sigma2 = ppca.noise_variance.unwrap();
        assert!(psi.iter().all(|&v| (v - sigma2).abs() < 0.04), "psi = {:?}, sigma2 = {}", psi, sigma2);

        let gap = covariance_error(&ppca.get_covariance().unwrap(), &fa.get_covariance().unwrap())
            .unwrap();
        assert!(gap < 0.05, "covariance gap {}", gap);
    }

    #[test]
    fn test_fa_covariance_is_positive_definite() {
        let data = heteroscedastic_data();
        let mut fa = FactorAnalysis::new(2).random_state(8);
        fa.fit(&data.observed).unwrap();

        let cov = fa.get_covariance().unwrap();
        assert_abs_diff_eq!(cov.clone(), cov.t().to_owned(), epsilon = 1e-12);
        assert!(cholesky(&cov).is_ok());
    }

    #[test]
    fn test_fa_dimension_mismatch() {
        let data = heteroscedastic_data();
        let mut fa = FactorAnalysis::new(2).max_iter(5).random_state(0);
        fa.fit(&data.observed).unwrap();

        assert!(matches!(
            fa.transform(&array![[1.0, 2.0, 3.0]]),
            Err(LatentError::DimensionMismatch { found: 3, expected: 6, .. })
        ));
        assert!(matches!(
            fa.inverse_transform(&array![[1.0, 2.0, 3.0]]),
            Err(LatentError::DimensionMismatch { found: 3, expected: 2, .. })
        ));
    }

    #[test]
    fn test_fa_rejects_single_sample() {
        let mut fa = FactorAnalysis::new(1);
        assert!(matches!(
            fa.fit(&array![[1.0, 2.0, 3.0]]),
            Err(LatentError::InvalidConfig(_))
        ));
        assert!(fa.components.is_none());
    }

    #[test]
    #[should_panic(expected = "tol must be non-negative")]
    fn test_fa_negative_tol_panics() {
        let _ = FactorAnalysis::new(1).tol(-1.0);
    }
}
