//! Protocol state machine — classifies each inbound frame and produces the
//! outbound frame sequence.
//!
//! [`ProtocolHandler::handle`] is synchronous and returns a lazy stream per
//! frame. Hook effects, executor items, and keep-alive ticks are all
//! awaited inside the returned stream as the transport drains it, so the
//! call itself never blocks. Registry mutations that order against other
//! frames (duplicate detection, `stop`, terminate teardown) happen eagerly
//! before the stream is handed out.

use std::pin::Pin;
use std::sync::Arc;

use futures::{stream, Stream, StreamExt};
use metrics::counter;
use serde_json::{json, Value};
use subwire_core::{codec, ClientMessageType, GraphqlRequest, OperationMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SubscriptionConfig;
use crate::executor::SubscriptionExecutor;
use crate::hooks::{NoopHooks, SubscriptionHooks};
use crate::keepalive::keep_alive_frames;
use crate::session::Session;

/// Lazy outbound frame sequence for one inbound frame.
pub type OutboundFrames = Pin<Box<dyn Stream<Item = OperationMessage> + Send>>;

/// The per-frame protocol state machine.
///
/// One handler serves any number of sessions; all per-connection state
/// lives in the [`Session`] passed to [`handle`](Self::handle).
pub struct ProtocolHandler {
    executor: Arc<dyn SubscriptionExecutor>,
    hooks: Arc<dyn SubscriptionHooks>,
    config: SubscriptionConfig,
}

impl ProtocolHandler {
    /// Create a handler with no-op hooks.
    pub fn new(executor: Arc<dyn SubscriptionExecutor>, config: SubscriptionConfig) -> Self {
        Self {
            executor,
            hooks: Arc::new(NoopHooks),
            config,
        }
    }

    /// Replace the lifecycle hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn SubscriptionHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Process one inbound text frame for `session`.
    ///
    /// Returns immediately with the frame's outbound sequence. The sequence
    /// may be empty, finite, or infinite (only the keep-alive tail is
    /// infinite); the transport emits each element to the peer.
    pub fn handle(&self, frame: &str, session: &Arc<Session>) -> OutboundFrames {
        let envelope = match codec::decode_frame(frame) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(session_id = %session.id(), error = %err, "undecodable frame");
                counter!("subwire_protocol_errors_total").increment(1);
                return single(connection_error(None, &err.to_string()));
            }
        };

        match envelope.client_type() {
            Some(ClientMessageType::ConnectionInit) => self.connection_init(envelope, session),
            Some(ClientMessageType::Start) => self.start(envelope, session),
            Some(ClientMessageType::Stop) => self.stop(envelope, session),
            Some(ClientMessageType::ConnectionTerminate) => self.terminate(session),
            None => {
                warn!(
                    session_id = %session.id(),
                    message_type = %envelope.message_type,
                    "unrecognized client message type"
                );
                counter!("subwire_protocol_errors_total").increment(1);
                let message =
                    format!("unrecognized message type: {}", envelope.message_type);
                single(connection_error(envelope.id, &message))
            }
        }
    }

    /// `connection_init`: run the connect hook, then ack. A qualifying
    /// first init chains the keep-alive ticker behind the ack.
    fn connection_init(&self, frame: OperationMessage, session: &Arc<Session>) -> OutboundFrames {
        let hooks = Arc::clone(&self.hooks);
        let session = Arc::clone(session);
        let keep_alive = self.config.keep_alive();

        Box::pin(async_stream::stream! {
            session.set_connection_params(frame.payload.clone());
            let params = session.connection_params();

            if let Err(err) = hooks.on_connect(params.as_ref(), &session).await {
                warn!(session_id = %session.id(), error = %err, "connect hook rejected session");
                counter!("subwire_connect_rejections_total").increment(1);
                session.record_connect_error(err.to_string());
                yield connection_error(frame.id, &err.to_string());
                return;
            }

            session.mark_initialized();
            debug!(session_id = %session.id(), "session initialized");
            yield OperationMessage::connection_ack();

            // Keep-alive only follows inits that carry an id, and at most
            // one ticker runs per session.
            if let Some(interval) = keep_alive {
                if frame.id.is_some() && session.try_start_keep_alive() {
                    let frames = keep_alive_frames(interval, session.cancel_token());
                    let mut frames = std::pin::pin!(frames);
                    while let Some(ka) = frames.next().await {
                        yield ka;
                    }
                }
            }
        })
    }

    /// `start`: register the operation id, gate through the operation
    /// hook, then relay the executor's result stream tagged by id.
    fn start(&self, frame: OperationMessage, session: &Arc<Session>) -> OutboundFrames {
        let Some(operation_id) = frame.id else {
            warn!(session_id = %session.id(), "start frame without operation id");
            counter!("subwire_protocol_errors_total").increment(1);
            return single(connection_error(None, "start requires an operation id"));
        };

        // A rejected handshake poisons later operations until a successful
        // re-init.
        if let Some(message) = session.connect_error() {
            return single(connection_error(Some(operation_id), &message));
        }

        let request = match decode_start_payload(&operation_id, frame.payload.as_ref()) {
            Ok(request) => request,
            Err(message) => {
                warn!(
                    session_id = %session.id(),
                    operation_id = %operation_id,
                    error = %message,
                    "invalid start payload"
                );
                counter!("subwire_protocol_errors_total").increment(1);
                return single(connection_error(Some(operation_id), &message));
            }
        };

        let token = CancellationToken::new();
        if !session.registry().try_insert(&operation_id, token.clone()) {
            // Repeated start for a live id: no second execution, no error
            // frame, just an immediately-complete empty sequence.
            debug!(
                session_id = %session.id(),
                operation_id = %operation_id,
                "duplicate operation id ignored"
            );
            return empty();
        }

        if session.registry().len() > self.config.max_operations {
            let _ = session.registry().remove(&operation_id);
            warn!(
                session_id = %session.id(),
                operation_id = %operation_id,
                max = self.config.max_operations,
                "operation limit reached"
            );
            return single(operation_error(&operation_id, "too many active operations"));
        }

        counter!("subwire_operations_started_total").increment(1);

        let hooks = Arc::clone(&self.hooks);
        let executor = Arc::clone(&self.executor);
        let session = Arc::clone(session);
        // Created before the stream so that dropping an unpolled stream
        // still releases the registry entry.
        let mut guard = OperationGuard::new(
            Arc::clone(&session),
            operation_id.clone(),
            token.clone(),
        );

        Box::pin(async_stream::stream! {
            // A stop can land before this stream is first polled.
            if token.is_cancelled() {
                guard.disarm();
                return;
            }

            let params = session.connection_params();
            if let Err(err) = hooks
                .on_operation(params.as_ref(), &session, &operation_id)
                .await
            {
                warn!(
                    session_id = %session.id(),
                    operation_id = %operation_id,
                    error = %err,
                    "operation hook rejected start"
                );
                guard.finish();
                yield operation_error(&operation_id, &err.to_string());
                return;
            }

            let responses = executor.execute_subscription(request);
            let mut responses = std::pin::pin!(responses);

            loop {
                let next = tokio::select! {
                    biased;
                    () = token.cancelled() => None,
                    item = responses.next() => Some(item),
                };

                // Cancelled by stop: the entry is already removed and the
                // stop frame answers with the final complete.
                let Some(item) = next else {
                    guard.disarm();
                    break;
                };

                match item {
                    Some(Ok(response)) => {
                        let payload = response.to_value();
                        if response.has_errors() {
                            yield OperationMessage::error(operation_id.clone(), payload);
                        } else {
                            yield OperationMessage::data(operation_id.clone(), payload);
                        }
                    }
                    Some(Err(err)) => {
                        warn!(
                            session_id = %session.id(),
                            operation_id = %operation_id,
                            error = %err,
                            "subscription stream failed"
                        );
                        guard.finish();
                        yield operation_error(&operation_id, &err.to_string());
                        notify_operation_complete(&hooks, &session);
                        break;
                    }
                    None => {
                        guard.finish();
                        yield OperationMessage::complete(operation_id.clone());
                        counter!("subwire_operations_completed_total").increment(1);
                        notify_operation_complete(&hooks, &session);
                        break;
                    }
                }
            }
        })
    }

    /// `stop`: cancel one live operation and answer its final `complete`.
    /// Never touches other operations, the keep-alive, or the transport.
    fn stop(&self, frame: OperationMessage, session: &Arc<Session>) -> OutboundFrames {
        let Some(operation_id) = frame.id else {
            return empty();
        };

        let Some(token) = session.registry().remove(&operation_id) else {
            debug!(
                session_id = %session.id(),
                operation_id = %operation_id,
                "stop for unknown operation"
            );
            return empty();
        };

        token.cancel();
        debug!(session_id = %session.id(), operation_id = %operation_id, "operation stopped");
        counter!("subwire_operations_completed_total").increment(1);
        notify_operation_complete(&self.hooks, session);

        single(OperationMessage::complete(operation_id))
    }

    /// `connection_terminate`: fire the disconnect hook, cancel every
    /// operation and the keep-alive, close the transport. Side effects run
    /// eagerly; the frame's own outbound sequence is empty.
    fn terminate(&self, session: &Arc<Session>) -> OutboundFrames {
        debug!(session_id = %session.id(), "terminating session");

        let params = session.connection_params();
        let hooks = Arc::clone(&self.hooks);
        let owned = Arc::clone(session);
        drop(tokio::spawn(async move {
            if let Err(err) = hooks.on_disconnect(&owned, params.as_ref()).await {
                warn!(session_id = %owned.id(), error = %err, "disconnect hook failed");
            }
        }));

        for token in session.registry().drain_all() {
            token.cancel();
        }
        session.cancel();
        session.close();
        counter!("subwire_sessions_terminated_total").increment(1);

        empty()
    }
}

/// Releases an operation's registry entry when its stream ends.
///
/// `finish` releases eagerly on a normal ending; `disarm` records that the
/// entry is already gone. A drop while still armed covers downstream
/// cancellation, which must release the entry without emitting `complete`.
/// The drop path skips removal once the token is cancelled: a cancelled
/// token means `stop` or terminate already took the entry, and the id may
/// since have been re-registered by a fresh `start`.
struct OperationGuard {
    session: Arc<Session>,
    operation_id: String,
    token: CancellationToken,
    armed: bool,
}

impl OperationGuard {
    fn new(session: Arc<Session>, operation_id: String, token: CancellationToken) -> Self {
        Self {
            session,
            operation_id,
            token,
            armed: true,
        }
    }

    /// Remove the registry entry now.
    fn finish(&mut self) {
        if self.armed {
            self.armed = false;
            let _ = self.session.registry().remove(&self.operation_id);
        }
    }

    /// The entry is already gone (client `stop`); nothing to release.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        if self.armed && !self.token.is_cancelled() {
            let _ = self.session.registry().remove(&self.operation_id);
        }
    }
}

/// Fire-and-forget `on_operation_complete`; failures are logged only.
fn notify_operation_complete(hooks: &Arc<dyn SubscriptionHooks>, session: &Arc<Session>) {
    let hooks = Arc::clone(hooks);
    let session = Arc::clone(session);
    drop(tokio::spawn(async move {
        if let Err(err) = hooks.on_operation_complete(&session).await {
            warn!(session_id = %session.id(), error = %err, "operation complete hook failed");
        }
    }));
}

fn decode_start_payload(
    operation_id: &str,
    payload: Option<&Value>,
) -> Result<GraphqlRequest, String> {
    let payload = payload.ok_or_else(|| "start requires a payload".to_owned())?;
    codec::decode_request(operation_id, payload).map_err(|err| err.to_string())
}

fn single(message: OperationMessage) -> OutboundFrames {
    Box::pin(stream::iter([message]))
}

fn empty() -> OutboundFrames {
    Box::pin(stream::empty())
}

fn connection_error(id: Option<String>, message: &str) -> OperationMessage {
    OperationMessage::connection_error(id, Some(json!({ "message": message })))
}

fn operation_error(id: &str, message: &str) -> OperationMessage {
    OperationMessage::error(id.to_owned(), json!({ "errors": [{ "message": message }] }))
}
