use thiserror::Error;

/// Errors for core triple and vocabulary operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An operation received an empty triple set where at least one triple
    /// is required.
    #[error("empty triple set passed to {0}")]
    EmptyInput(&'static str),

    /// A raw row did not have exactly three columns.
    #[error("malformed triple row: expected 3 columns, got {0}")]
    MalformedTriple(usize),

    /// Entity identifier not present in the vocabulary.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Relation identifier not present in the vocabulary.
    #[error("unknown relation: {0}")]
    UnknownRelation(String),

    /// Strict filtering found triples with identifiers outside the vocabulary.
    #[error("{0} triples contain identifiers not present in the vocabulary")]
    UnseenEntities(usize),

    /// The requested split cannot keep every entity/relation in the training set.
    #[error(
        "cannot create a test split of the desired size: some entities or relations \
         would not occur in both training and test sets; set allow_duplication=true \
         or set test_size to a smaller value"
    )]
    InfeasibleSplit,

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for vektra-core.
pub type Result<T> = std::result::Result<T, Error>;
