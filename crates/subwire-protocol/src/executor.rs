//! Execution seam for subscription operations.
//!
//! The GraphQL engine lives with the embedder; the protocol only needs a
//! way to turn a request into a lazy stream of response payloads.

use std::pin::Pin;

use futures::Stream;
use subwire_core::{GraphqlRequest, GraphqlResponse};
use thiserror::Error;

/// Result stream produced by [`SubscriptionExecutor::execute_subscription`].
pub type ResponseStream =
    Pin<Box<dyn Stream<Item = Result<GraphqlResponse, ExecutorError>> + Send>>;

/// Errors surfaced through an executor's response stream.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The subscription failed upstream.
    #[error("{message}")]
    Failed {
        /// Error description, forwarded to the client in an `error` frame.
        message: String,
    },

    /// The stream was cancelled before completion.
    #[error("subscription cancelled")]
    Cancelled,
}

impl ExecutorError {
    /// Create a failure with a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Executes GraphQL subscription operations.
///
/// Implementations return a lazy stream of response payloads. The stream
/// may be finite or infinite and must stop producing work when dropped;
/// dropping it is how the protocol cancels an operation.
pub trait SubscriptionExecutor: Send + Sync {
    /// Start the subscription described by `request`.
    ///
    /// The call itself must not block; all work happens as the returned
    /// stream is polled.
    fn execute_subscription(&self, request: GraphqlRequest) -> ResponseStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_carries_message() {
        let err = ExecutorError::failed("backend gone");
        assert_eq!(err.to_string(), "backend gone");
    }

    #[test]
    fn cancelled_display() {
        assert_eq!(ExecutorError::Cancelled.to_string(), "subscription cancelled");
    }

    #[test]
    fn is_std_error() {
        let err = ExecutorError::failed("x");
        let _: &dyn std::error::Error = &err;
    }
}
