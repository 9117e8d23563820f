//! Error type shared by every fallible stream operation.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors raised by stream construction and evaluation.
///
/// Empty inputs are never errors: `min`, `max`, `average` and the find
/// operations report them as `None`.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A terminal operation was invoked on a stream released by
    /// [`NumStream::close`](crate::NumStream::close).
    #[error("stream has already been closed (attempted `{operation}`)")]
    Closed {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// A bounded random source was given `origin >= bound`, or float bounds
    /// whose span is not finite.
    #[error("bound must be greater than origin (origin: {origin}, bound: {bound})")]
    InvalidRange {
        /// Requested inclusive lower bound.
        origin: String,
        /// Requested exclusive upper bound.
        bound: String,
    },

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl StreamError {
    pub(crate) fn invalid_range<T: std::fmt::Debug>(origin: T, bound: T) -> Self {
        StreamError::InvalidRange {
            origin: format!("{origin:?}"),
            bound: format!("{bound:?}"),
        }
    }
}
