//! Side-by-side fit of PPCA and Factor Analysis on the same dataset.

use crate::dataset::LatentDataset;
use crate::decomposition::{FactorAnalysis, PPCA};
use crate::error::{LatentError, Result};
use crate::metrics::{covariance_error, reconstruction_error, subspace_distance};
use crate::{Matrix, Vector};
use std::fmt;

/// What one fitted model says about a dataset.
#[derive(Clone, Debug)]
pub struct ModelSummary {
    pub name: &'static str,
    pub loadings: Matrix,
    /// Per-feature noise variance (constant across features for PPCA).
    pub noise_variance: Vector,
    pub reconstruction: Matrix,
    pub reconstruction_mse: f64,
    /// Average log-likelihood of the training data.
    pub log_likelihood: f64,
    /// Frobenius distance between model and true covariance.
    pub covariance_error: f64,
    /// Only available when the model has as many factors as the generator.
    pub subspace_distance: Option<f64>,
    pub n_iter: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ModelComparison {
    pub n_components: usize,
    pub true_noise_variance: Vector,
    pub ppca: ModelSummary,
    pub fa: ModelSummary,
}

impl ModelComparison {
    /// Fits PPCA with the same number of components as `fa`, then `fa`
    /// itself, on the observed data of `dataset`.
    pub fn fit(dataset: &LatentDataset, mut fa: FactorAnalysis) -> Result<Self> {
        let x = &dataset.observed;
        let n_components = fa.n_components();
        let true_cov = dataset.true_covariance();
        let compare_subspace = n_components == dataset.n_latent();

        let mut ppca = PPCA::new(n_components);
        ppca.fit(x)?;
        fa.fit(x)?;

        let ppca_loadings = ppca.components.clone().ok_or(LatentError::NotFitted("PPCA"))?;
        let ppca_reconstruction = ppca.reconstruct(x)?;
        let ppca_summary = ModelSummary {
            name: "PPCA",
            noise_variance: Vector::from_elem(
                dataset.n_features(),
                ppca.noise_variance.ok_or(LatentError::NotFitted("PPCA"))?,
            ),
            reconstruction_mse: reconstruction_error(x, &ppca_reconstruction)?,
            log_likelihood: ppca.score(x)?,
            covariance_error: covariance_error(&true_cov, &ppca.get_covariance()?)?,
            subspace_distance: if compare_subspace {
                Some(subspace_distance(&dataset.loadings, &ppca_loadings)?)
            } else {
                None
            },
            n_iter: None,
            loadings: ppca_loadings,
            reconstruction: ppca_reconstruction,
        };

        let fa_loadings = fa
            .components
            .clone()
            .ok_or(LatentError::NotFitted("FactorAnalysis"))?;
        let fa_reconstruction = fa.reconstruct(x)?;
        let fa_summary = ModelSummary {
            name: "Factor Analysis",
            noise_variance: fa
                .noise_variance
                .clone()
                .ok_or(LatentError::NotFitted("FactorAnalysis"))?,
            reconstruction_mse: reconstruction_error(x, &fa_reconstruction)?,
            log_likelihood: fa.score(x)?,
            covariance_error: covariance_error(&true_cov, &fa.get_covariance()?)?,
            subspace_distance: if compare_subspace {
                Some(subspace_distance(&dataset.loadings, &fa_loadings)?)
            } else {
                None
            },
            n_iter: Some(fa.n_iter),
            loadings: fa_loadings,
            reconstruction: fa_reconstruction,
        };

        Ok(Self {
            n_components,
            true_noise_variance: dataset.noise_std.mapv(|s| s * s),
            ppca: ppca_summary,
            fa: fa_summary,
        })
    }
}

fn fmt_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.6}", v))
}

impl fmt::Display for ModelComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Latent components: {}", self.n_components)?;
        writeln!(f, "{:<24} {:>16} {:>16}", "Metric", self.ppca.name, self.fa.name)?;
        writeln!(f, "{}", "-".repeat(58))?;
        writeln!(
            f,
            "{:<24} {:>16.6} {:>16.6}",
            "Reconstruction MSE", self.ppca.reconstruction_mse, self.fa.reconstruction_mse
        )?;
        writeln!(
            f,
            "{:<24} {:>16.6} {:>16.6}",
            "Avg log-likelihood", self.ppca.log_likelihood, self.fa.log_likelihood
        )?;
        writeln!(
            f,
            "{:<24} {:>16.6} {:>16.6}",
            "Covariance error", self.ppca.covariance_error, self.fa.covariance_error
        )?;
        writeln!(
            f,
            "{:<24} {:>16} {:>16}",
            "Subspace distance",
            fmt_optional(self.ppca.subspace_distance),
            fmt_optional(self.fa.subspace_distance)
        )?;
        writeln!(
            f,
            "{:<24} {:>16} {:>16}",
            "EM iterations",
            self.ppca.n_iter.map_or("-".to_string(), |n| n.to_string()),
            self.fa.n_iter.map_or("-".to_string(), |n| n.to_string())
        )?;

        writeln!(f)?;
        writeln!(f, "{:<24} {:>10} {:>10} {:>10}", "Noise variance", "true", "PPCA", "FA")?;
        writeln!(f, "{}", "-".repeat(58))?;
        for (j, truth) in self.true_noise_variance.iter().enumerate() {
            writeln!(
                f,
                "{:<24} {:>10.4} {:>10.4} {:>10.4}",
                format!("feature {}", j),
                truth,
                self.ppca.noise_variance[j],
                self.fa.noise_variance[j]
            )?;
        }

        Ok(())
    }
}
