use thiserror::Error;

/// Errors raised while generating data or fitting latent-variable models.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LatentError {
    #[error("input matrix must have at least one sample and one feature")]
    EmptyInput,
    #[error("n_components={requested} cannot be larger than n_features={available}")]
    InvalidComponents { requested: usize, available: usize },
    #[error("number of features in X ({found}) doesn't match {expected_what} ({expected})")]
    DimensionMismatch {
        found: usize,
        expected: usize,
        expected_what: &'static str,
    },
    #[error("shape {found:?} doesn't match {expected_what} shape {expected:?}")]
    ShapeMismatch {
        found: (usize, usize),
        expected: (usize, usize),
        expected_what: &'static str,
    },
    #[error("{0} not fitted. Call fit() first.")]
    NotFitted(&'static str),
    #[error("matrix is singular or nearly singular")]
    Singular,
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("{0} contains non-finite values")]
    NonFinite(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LatentError>;
