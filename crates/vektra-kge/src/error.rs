use thiserror::Error;

/// Errors that can occur in vektra-kge.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the core triple/vocabulary layer.
    #[error(transparent)]
    Core(#[from] vektra_core::Error),

    /// Model used before `fit` completed.
    #[error("model is not fitted; call fit() before scoring or evaluating")]
    NotFitted,

    /// Metric requested over an empty rank sequence.
    #[error("rank sequence is empty")]
    EmptyRanks,

    /// Ranks are 1-based; a zero rank is invalid input.
    #[error("ranks are 1-based; found rank 0 at position {0}")]
    InvalidRank(usize),

    /// Filtering removed every corruption candidate for a side.
    #[error("no corruption candidates remain for side `{0}` after filtering")]
    EmptyCandidates(&'static str),

    /// Hyperparameter missing or of the wrong type.
    #[error("hyperparameter `{0}` is missing or has the wrong type")]
    InvalidParam(String),

    /// Grid enumeration requested on a grid with sampler leaves.
    #[error(
        "parameter grid contains sampler leaves and cannot be enumerated; \
         use random search with max_combinations"
    )]
    NonEnumerableGrid,

    /// Model selection finished without a single evaluated candidate.
    #[error("model selection produced no evaluated candidates")]
    NoCandidates,

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for vektra-kge.
pub type Result<T> = std::result::Result<T, Error>;
