use thiserror::Error;

/// Errors surfaced by the library. Solving itself cannot fail on valid input,
/// so most variants belong to the ingestion and configuration boundary.
#[derive(Debug, Error)]
pub enum FasError {
    #[error("solution has {found} entries but the graph has {expected} vertices")]
    InvalidSolution { expected: usize, found: usize },

    #[error("solution is not a permutation of 0..{0}")]
    NotAPermutation(usize),

    #[error("unknown algorithm `{0}`")]
    UnknownAlgorithm(String),

    #[error("unknown graph format `{0}` (expected one of U, W, DW, DU, SU, LU, LO)")]
    UnknownFormat(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("vertex {vertex} is out of range for a graph with {n} vertices")]
    VertexOutOfRange { vertex: usize, n: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FasError>;
