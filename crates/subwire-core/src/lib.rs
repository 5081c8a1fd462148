//! # subwire-core
//!
//! Wire vocabulary for the legacy Apollo `graphql-ws` subscription protocol:
//!
//! - **Envelope**: the `{type, id, payload}` JSON object common to all frames
//! - **Message types**: the closed client and server `type` sets
//! - **Payloads**: `GraphqlRequest` / `GraphqlResponse` / `GraphqlError`
//! - **Codec**: frame and payload decoding with typed errors

#![deny(unsafe_code)]

pub mod codec;
pub mod envelope;
pub mod request;

pub use codec::{decode_frame, decode_request, DecodeError, PayloadDecodeError};
pub use envelope::{ClientMessageType, OperationMessage};
pub use request::{GraphqlError, GraphqlRequest, GraphqlResponse};
