use thiserror::Error;

/// Hard failures of engine operations.
///
/// Routine outcomes of registering and cancelling (missing entities, double
/// registration) are reported through the status enums instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// The caller supplied malformed data.
    #[error("{0}")]
    InvalidArgument(String),

    /// The request is well-formed but contradicts the current state.
    #[error("{0}")]
    Conflict(String),
}

impl BookingError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
