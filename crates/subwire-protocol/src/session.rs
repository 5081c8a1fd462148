//! Per-connection session state.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::registry::OperationRegistry;
use crate::transport::Transport;

/// Everything the protocol tracks for one WebSocket connection.
///
/// Created by the embedding server when a connection is accepted and handed
/// to [`ProtocolHandler::handle`](crate::handler::ProtocolHandler::handle)
/// with every inbound frame. Dropped when the transport goes away.
pub struct Session {
    transport: Arc<dyn Transport>,
    registry: OperationRegistry,
    /// Cancelled on terminate; ends the keep-alive and anything else
    /// scoped to the session.
    cancel: CancellationToken,
    closed: AtomicBool,
    keep_alive_started: AtomicBool,
    state: Mutex<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    initialized: bool,
    connection_params: Option<Value>,
    connect_error: Option<String>,
}

impl Session {
    /// Create a session for a freshly accepted connection.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            registry: OperationRegistry::new(),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
            keep_alive_started: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Stable session id, taken from the transport.
    #[must_use]
    pub fn id(&self) -> &str {
        self.transport.id()
    }

    /// The session's operation registry.
    #[must_use]
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// A clone of the session-scoped cancel token.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel everything scoped to the session.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Close the transport. Only the first call is forwarded.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.transport.close();
        }
    }

    /// Whether the transport has been closed through this session.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Record the `connection_init` payload for later hook calls.
    pub fn set_connection_params(&self, params: Option<Value>) {
        self.state.lock().connection_params = params;
    }

    /// The retained `connection_init` payload, if any.
    #[must_use]
    pub fn connection_params(&self) -> Option<Value> {
        self.state.lock().connection_params.clone()
    }

    /// Mark the handshake successful. Clears any remembered connect
    /// failure from an earlier init.
    pub fn mark_initialized(&self) {
        let mut state = self.state.lock();
        state.initialized = true;
        state.connect_error = None;
    }

    /// Whether a `connection_init` has completed successfully.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Remember a failed `on_connect`; later `start`s answer with this.
    pub fn record_connect_error(&self, message: String) {
        self.state.lock().connect_error = Some(message);
    }

    /// The remembered connect failure, if the last init was rejected.
    #[must_use]
    pub fn connect_error(&self) -> Option<String> {
        self.state.lock().connect_error.clone()
    }

    /// Claim the session's single keep-alive slot.
    ///
    /// Returns `true` exactly once per session.
    pub fn try_start_keep_alive(&self) -> bool {
        !self.keep_alive_started.swap(true, Ordering::SeqCst)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("active_operations", &self.registry.len())
            .field("initialized", &self.is_initialized())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct FakeTransport {
        closes: AtomicUsize,
    }

    impl FakeTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                closes: AtomicUsize::new(0),
            })
        }
    }

    impl Transport for FakeTransport {
        fn id(&self) -> &str {
            "sess_1"
        }

        fn close(&self) {
            let _ = self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn fresh_session_state() {
        let session = Session::new(FakeTransport::new());
        assert_eq!(session.id(), "sess_1");
        assert!(!session.is_initialized());
        assert!(!session.is_closed());
        assert!(session.connection_params().is_none());
        assert!(session.connect_error().is_none());
        assert!(session.registry().is_empty());
    }

    #[test]
    fn close_forwards_exactly_once() {
        let transport = FakeTransport::new();
        let session = Session::new(transport.clone());
        session.close();
        session.close();
        session.close();
        assert_eq!(transport.closes.load(Ordering::SeqCst), 1);
        assert!(session.is_closed());
    }

    #[test]
    fn keep_alive_slot_is_claimed_once() {
        let session = Session::new(FakeTransport::new());
        assert!(session.try_start_keep_alive());
        assert!(!session.try_start_keep_alive());
        assert!(!session.try_start_keep_alive());
    }

    #[test]
    fn connection_params_round_trip() {
        let session = Session::new(FakeTransport::new());
        session.set_connection_params(Some(json!({"authToken": "t"})));
        assert_eq!(
            session.connection_params().unwrap()["authToken"],
            json!("t")
        );
    }

    #[test]
    fn mark_initialized_clears_connect_error() {
        let session = Session::new(FakeTransport::new());
        session.record_connect_error("denied".into());
        assert_eq!(session.connect_error().as_deref(), Some("denied"));

        session.mark_initialized();
        assert!(session.is_initialized());
        assert!(session.connect_error().is_none());
    }

    #[test]
    fn cancel_token_observes_cancel() {
        let session = Session::new(FakeTransport::new());
        let token = session.cancel_token();
        assert!(!token.is_cancelled());
        session.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn debug_includes_id() {
        let session = Session::new(FakeTransport::new());
        let debug = format!("{session:?}");
        assert!(debug.contains("sess_1"));
    }
}
