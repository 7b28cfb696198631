use thiserror::Error;

/// Errors produced by the network core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("{vector} vector has length {actual}, layer expects {expected}")]
    ShapeMismatch {
        vector: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("network has no layers")]
    EmptyNetwork,
    #[error("snapshot is inconsistent: {0}")]
    MalformedSnapshot(String),
}

pub type NetResult<T> = Result<T, NetError>;
