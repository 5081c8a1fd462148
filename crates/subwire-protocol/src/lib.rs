//! # subwire-protocol
//!
//! Server-side engine for the legacy Apollo `graphql-ws` subscription
//! protocol. One [`ProtocolHandler`] turns each inbound text frame into a
//! lazy outbound frame stream, multiplexing any number of long-lived
//! subscription operations over a single WebSocket connection:
//!
//! - Per-session state machine with idempotent operation registration
//! - Executor result streams tagged `data` / `error` per operation id
//! - Keep-alive ticker bound to the session, independent of any operation
//! - Lifecycle hooks (`on_connect`, `on_operation`, …) at the seams
//! - Clean teardown on `stop`, `connection_terminate`, and cancellation
//!
//! The WebSocket itself, GraphQL execution, and server bootstrap live with
//! the embedder; this crate consumes them through the [`Transport`] and
//! [`SubscriptionExecutor`] seams.

#![deny(unsafe_code)]

pub mod config;
pub mod executor;
pub mod handler;
pub mod hooks;
pub mod keepalive;
pub mod registry;
pub mod session;
pub mod transport;

pub use config::SubscriptionConfig;
pub use executor::{ExecutorError, ResponseStream, SubscriptionExecutor};
pub use handler::{OutboundFrames, ProtocolHandler};
pub use hooks::{HookError, NoopHooks, SubscriptionHooks};
pub use session::Session;
pub use transport::Transport;
