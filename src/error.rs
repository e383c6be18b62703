//! Error types delivered through [`Subscriber::on_error`](crate::Subscriber::on_error).
//!
//! [`StreamError`] covers every failure the subscription core originates itself:
//!
//! - [`StreamError::InvalidDemand`] — the subscriber broke the protocol by requesting `n <= 0`.
//! - [`StreamError::Producer`] — the producer could not advance its source; the original error is kept as `source()`.
//! - [`StreamError::ProducerPanicked`] — the producer panicked inside its production hook.
//!
//! Each variant provides helper methods (`as_label`, `as_message`) for logging/metrics.

use std::any::Any;

use thiserror::Error;

/// Boxed error used to carry a producer's original failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Terminal failures of a subscription.
///
/// At most one of these is delivered per subscription, and never after
/// cancellation. The core never retries; recovery (e.g. re-subscribing) is
/// up to the subscriber.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StreamError {
    /// `request` was called with a non-positive count.
    #[error("invalid demand {requested}: request count must be positive")]
    InvalidDemand {
        /// The rejected count.
        requested: i64,
    },

    /// Advancing the producer's source failed.
    #[error("producer failed: {source}")]
    Producer {
        /// The original failure.
        #[source]
        source: BoxError,
    },

    /// The producer panicked while producing.
    #[error("producer panicked: {info}")]
    ProducerPanicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl StreamError {
    /// Wraps an arbitrary error as a [`StreamError::Producer`].
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use demandflow::StreamError;
    ///
    /// let err = StreamError::producer(std::io::Error::other("disk gone"));
    /// assert_eq!(err.as_label(), "producer_failed");
    /// assert_eq!(err.source().unwrap().to_string(), "disk gone");
    /// ```
    pub fn producer(error: impl Into<BoxError>) -> Self {
        StreamError::Producer {
            source: error.into(),
        }
    }

    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        StreamError::ProducerPanicked {
            info: panic_message(payload),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use demandflow::StreamError;
    ///
    /// let err = StreamError::InvalidDemand { requested: 0 };
    /// assert_eq!(err.as_label(), "invalid_demand");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::InvalidDemand { .. } => "invalid_demand",
            StreamError::Producer { .. } => "producer_failed",
            StreamError::ProducerPanicked { .. } => "producer_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StreamError::InvalidDemand { requested } => format!("invalid demand: {requested}"),
            StreamError::Producer { source } => format!("producer: {source}"),
            StreamError::ProducerPanicked { info } => format!("panic: {info}"),
        }
    }

    /// Indicates whether the subscriber, not the producer, caused the failure.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, StreamError::InvalidDemand { .. })
    }
}

/// Renders a panic payload (`&str` or `String` in practice) as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
