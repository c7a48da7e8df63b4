use thiserror::Error;

/// Every failure in the crate maps to exactly one of these kinds.
#[derive(Debug, Error)]
pub enum Error {
    /// A constructor or setter received a value outside its documented
    /// domain (negative capacity, unknown band, empty slot range, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A lookup used an index outside the current container extent.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A structural mutation is forbidden by the current state
    /// (re-setting an id, reshaping an occupied fiber, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An optional node attribute was read before being written.
    #[error("attribute not set: {0}")]
    NotSet(&'static str),

    /// An external file failed schema or semantic validation. Covers both
    /// malformed JSON and topology-level violations such as a missing
    /// reverse link or a non-continuous route.
    #[error("invalid file: {0}")]
    InvalidFile(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::InvalidFile(format!("i/o failure: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidFile(format!("JSON parse failure: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
