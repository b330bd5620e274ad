use std::fmt;
use std::sync::Arc;

/// Process-unique identity of a promise, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromiseId(pub(crate) u64);

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rejection reason shared by every consumer of a promise.
///
/// Cloning is cheap: payloads that are not plain text live behind an `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Message(Arc<str>),
    #[error(transparent)]
    Custom(Arc<dyn std::error::Error + Send + Sync>),
    #[error("chaining cycle detected for promise {0}")]
    ChainingCycle(PromiseId),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("task panicked with a non-string payload (fault {fault})")]
    Panicked { fault: u64 },
    #[error("failed to spawn task: {0}")]
    Spawn(Arc<std::io::Error>),
    #[error("spawn configuration was already set")]
    AlreadyConfigured,
}

impl Error {
    /// A rejection reason carrying only text.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Message(Arc::from(message.into()))
    }

    /// Wraps any error type as a rejection reason.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Custom(Arc::new(error))
    }

    /// Returns the branch reasons if this is an aggregate failure.
    pub fn as_aggregate(&self) -> Option<&AggregateError> {
        match self {
            Error::Aggregate(aggregate) => Some(aggregate),
            _ => None,
        }
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::msg(message)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::msg(message)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::new(error)
    }
}

/// Every branch of an [`any`](crate::any) call failed.
///
/// Reasons are kept in input order.
#[derive(Debug, Clone, thiserror::Error)]
#[error("all {} promises were rejected", .errors.len())]
pub struct AggregateError {
    errors: Vec<Error>,
}

impl AggregateError {
    pub(crate) fn new(errors: Vec<Error>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }
}
