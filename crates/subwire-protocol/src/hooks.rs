//! Lifecycle hooks.
//!
//! Embedders observe and gate the session lifecycle by implementing
//! [`SubscriptionHooks`]. Every method defaults to a no-op so callers
//! configure only what they care about.
//!
//! `on_connect` and `on_operation` gate the protocol: their failures are
//! surfaced to the client. `on_operation_complete` and `on_disconnect` are
//! observational: failures are logged and swallowed.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::session::Session;

/// Error returned by a failing hook.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HookError {
    /// Failure description, surfaced to the client where the protocol
    /// allows it.
    pub message: String,
}

impl HookError {
    /// Create a hook error from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Session lifecycle hooks.
#[async_trait]
pub trait SubscriptionHooks: Send + Sync {
    /// Called after a `connection_init` decodes, before `connection_ack`
    /// is produced. Failure suppresses the ack and poisons the session
    /// until a later init succeeds.
    async fn on_connect(
        &self,
        _params: Option<&Value>,
        _session: &Session,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Called before a `start` reaches the executor, after its operation
    /// id is registered. Failure answers the operation with a single
    /// `error` frame and releases the id.
    async fn on_operation(
        &self,
        _params: Option<&Value>,
        _session: &Session,
        _operation_id: &str,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Called when an operation ends, via `stop` or end-of-stream.
    async fn on_operation_complete(&self, _session: &Session) -> Result<(), HookError> {
        Ok(())
    }

    /// Called on `connection_terminate`. The transport is closed whether
    /// or not this fails.
    async fn on_disconnect(
        &self,
        _session: &Session,
        _params: Option<&Value>,
    ) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hooks implementation that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl SubscriptionHooks for NoopHooks {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use std::sync::Arc;

    struct FakeTransport;

    impl Transport for FakeTransport {
        fn id(&self) -> &str {
            "conn_1"
        }

        fn close(&self) {}
    }

    fn make_session() -> Session {
        Session::new(Arc::new(FakeTransport))
    }

    #[tokio::test]
    async fn noop_hooks_all_succeed() {
        let hooks = NoopHooks;
        let session = make_session();
        assert!(hooks.on_connect(None, &session).await.is_ok());
        assert!(hooks.on_operation(None, &session, "op_1").await.is_ok());
        assert!(hooks.on_operation_complete(&session).await.is_ok());
        assert!(hooks.on_disconnect(&session, None).await.is_ok());
    }

    #[tokio::test]
    async fn hooks_are_object_safe() {
        let hooks: Arc<dyn SubscriptionHooks> = Arc::new(NoopHooks);
        let session = make_session();
        assert!(hooks.on_connect(None, &session).await.is_ok());
    }

    #[test]
    fn hook_error_display_is_the_message() {
        let err = HookError::new("not authorized");
        assert_eq!(err.to_string(), "not authorized");
    }

    #[tokio::test]
    async fn partial_override_keeps_other_defaults() {
        struct RejectConnect;

        #[async_trait]
        impl SubscriptionHooks for RejectConnect {
            async fn on_connect(
                &self,
                _params: Option<&Value>,
                _session: &Session,
            ) -> Result<(), HookError> {
                Err(HookError::new("nope"))
            }
        }

        let hooks = RejectConnect;
        let session = make_session();
        assert!(hooks.on_connect(None, &session).await.is_err());
        assert!(hooks.on_operation(None, &session, "op_1").await.is_ok());
    }
}
