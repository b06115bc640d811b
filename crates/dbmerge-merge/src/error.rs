use thiserror::Error;

/// Errors raised while setting up or running a merge.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A required collaborator or setting is missing or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The operation is not available on this object.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// The shared model lock was poisoned by a panicking writer.
    #[error("model lock poisoned")]
    ModelLock,
    /// A token referenced an object that is not part of the model.
    #[error("missing model object: {0}")]
    MissingEntity(String),
    #[error(transparent)]
    Core(#[from] dbmerge_core::Error),
}

/// Result type for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;
