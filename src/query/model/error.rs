use thiserror::Error;

/// Errors raised by the query model and the join-order reconstructor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinOrderError {
    /// Caller contract violation. Not retryable.
    #[error("Malformed query model: {0}")]
    MalformedModel(String),

    /// The ordering cannot be realized as a connected left-deep tree
    #[error("Invalid join order: {0}")]
    InvalidJoinOrder(String),
}

impl JoinOrderError {
    /// True for failures the exploration loop absorbs and retries
    pub fn is_invalid_order(&self) -> bool {
        matches!(self, JoinOrderError::InvalidJoinOrder(_))
    }
}

/// Result type for query model and reconstruction operations
pub type JoinOrderResult<T> = Result<T, JoinOrderError>;
