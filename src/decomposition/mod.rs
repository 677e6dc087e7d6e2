//! Linear-Gaussian latent-variable models.
//!
//! Both models explain observations as `x = W z + mu + eps` with a
//! low-dimensional standard-normal latent `z`:
//! - `PPCA`: Probabilistic PCA, isotropic noise `sigma² I`, fitted in closed form
//! - `FactorAnalysis`: diagonal noise `Psi`, fitted by Expectation-Maximization
//!
//! # Examples
//!
//! ## Probabilistic PCA
//! ```rust
//! use latent_factors::{LatentGenerator, PPCA};
//!
//! let data = LatentGenerator::new().random_state(0).generate().unwrap();
//!
//! let mut ppca = PPCA::new(2);
//! let latent = ppca.fit_transform(&data.observed).unwrap();
//! assert_eq!(latent.ncols(), 2);
//!
//! // Single noise variance shared by every feature
//! let sigma2 = ppca.noise_variance.unwrap();
//! println!("sigma^2: {:.4}", sigma2);
//!
//! let reconstructed = ppca.inverse_transform(&latent).unwrap();
//! assert_eq!(reconstructed.dim(), data.observed.dim());
//! ```
//!
//! ## Factor Analysis
//! ```rust
//! use latent_factors::{FactorAnalysis, LatentGenerator};
//!
//! let data = LatentGenerator::new().random_state(0).generate().unwrap();
//!
//! let mut fa = FactorAnalysis::new(2).max_iter(100).random_state(0);
//! fa.fit(&data.observed).unwrap();
//!
//! // One noise variance per feature
//! let psi = fa.noise_variance.as_ref().unwrap();
//! assert_eq!(psi.len(), 3);
//!
//! let reconstructed = fa.reconstruct(&data.observed).unwrap();
//! println!("log-likelihood: {:.4}", fa.score(&data.observed).unwrap());
//! # assert_eq!(reconstructed.dim(), data.observed.dim());
//! ```

mod factor_analysis;
mod gaussian;
mod ppca;

pub use factor_analysis::FactorAnalysis;
pub use ppca::PPCA;
