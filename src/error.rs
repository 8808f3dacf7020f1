use crate::Timestamp;

/// Errors raised by the quote provider, stream hubs, buffers and batch
/// computations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid quote at t={timestamp}: `{field}` must be finite, was {value}")]
    InvalidQuote {
        timestamp: Timestamp,
        field: &'static str,
        value: f64,
    },
    #[error("Duplicate timestamp {0} in input series")]
    DuplicateTimestamp(Timestamp),
    #[error("Input series is not sorted: t={timestamp} follows t={previous}")]
    UnsortedSeries {
        timestamp: Timestamp,
        previous: Timestamp,
    },
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Timestamp {0} not found")]
    TimestampNotFound(Timestamp),
    #[error("Index {index} out of range for series of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("{hub} is out of sync with its provider: {reason}")]
    OutOfSync { hub: String, reason: String },
    #[error("{0} is faulted, reinitialize it before sending further mutations")]
    Faulted(String),
    #[error("{0} received a mutation while notifying its subscribers")]
    Reentrant(String),
    #[error("Compute failed at index {index}: {reason}")]
    Compute { index: usize, reason: String },
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_sync(hub: impl ToString, reason: impl Into<String>) -> Self {
        Self::OutOfSync {
            hub: hub.to_string(),
            reason: reason.into(),
        }
    }
}
