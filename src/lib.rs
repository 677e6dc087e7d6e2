pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod comparison;
pub mod dataset;
pub mod decomposition;
pub mod error;
pub mod linalg;
pub mod metrics;

pub use comparison::{ModelComparison, ModelSummary};
pub use dataset::{LatentDataset, LatentGenerator};
pub use decomposition::{FactorAnalysis, PPCA};
pub use error::{LatentError, Result};

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Seeded generator when `random_state` is given, entropy-seeded otherwise.
pub(crate) fn seeded_rng(random_state: Option<u64>) -> StdRng {
    match random_state {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
