//! Frame and payload decoding.
//!
//! Decoding an envelope succeeds for any JSON object with a string `type`.
//! Validating the type against the client set is the protocol handler's
//! job, so it can answer unknown types with a `connection_error` that
//! echoes the frame's `id`.

use serde_json::Value;
use thiserror::Error;

use crate::envelope::OperationMessage;
use crate::request::GraphqlRequest;

/// The frame is not a graphql-ws envelope: not valid JSON, or the decoded
/// object lacks a string `type` field.
#[derive(Debug, Error)]
#[error("invalid message envelope: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// A `start` payload that does not decode as a [`GraphqlRequest`].
#[derive(Debug, Error)]
#[error("operation {operation_id}: payload is not a valid GraphQL request: {source}")]
pub struct PayloadDecodeError {
    /// Operation id the bad payload arrived under.
    pub operation_id: String,
    #[source]
    source: serde_json::Error,
}

/// Decode a text frame into an envelope.
pub fn decode_frame(text: &str) -> Result<OperationMessage, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

/// Re-decode a `start` payload as a [`GraphqlRequest`].
pub fn decode_request(
    operation_id: &str,
    payload: &Value,
) -> Result<GraphqlRequest, PayloadDecodeError> {
    serde_json::from_value(payload.clone()).map_err(|source| PayloadDecodeError {
        operation_id: operation_id.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ClientMessageType;
    use serde_json::json;

    #[test]
    fn decode_minimal_frame() {
        let msg = decode_frame(r#"{"type":"connection_init"}"#).unwrap();
        assert_eq!(msg.message_type, "connection_init");
        assert!(msg.id.is_none());
        assert!(msg.payload.is_none());
    }

    #[test]
    fn decode_full_frame() {
        let msg = decode_frame(
            r#"{"type":"start","id":"op_1","payload":{"query":"{ message }"}}"#,
        )
        .unwrap();
        assert_eq!(msg.client_type(), Some(ClientMessageType::Start));
        assert_eq!(msg.id.as_deref(), Some("op_1"));
        assert!(msg.payload.is_some());
    }

    #[test]
    fn decode_empty_string_fails() {
        assert!(decode_frame("").is_err());
    }

    #[test]
    fn decode_non_json_fails() {
        assert!(decode_frame("not json at all").is_err());
    }

    #[test]
    fn decode_non_object_fails() {
        assert!(decode_frame("[1,2,3]").is_err());
        assert!(decode_frame("\"start\"").is_err());
    }

    #[test]
    fn decode_missing_type_fails() {
        assert!(decode_frame(r#"{"id":"op_1"}"#).is_err());
    }

    #[test]
    fn decode_non_string_type_fails() {
        assert!(decode_frame(r#"{"type":42}"#).is_err());
        assert!(decode_frame(r#"{"type":null}"#).is_err());
    }

    #[test]
    fn decode_does_not_validate_type_value() {
        // Unknown types survive the codec; the handler classifies them.
        let msg = decode_frame(r#"{"type":"subscribe","id":"op_1"}"#).unwrap();
        assert_eq!(msg.message_type, "subscribe");
        assert!(msg.client_type().is_none());
    }

    #[test]
    fn decode_request_valid_payload() {
        let payload = json!({"query": "{ message }", "operationName": "Q"});
        let req = decode_request("op_1", &payload).unwrap();
        assert_eq!(req.query, "{ message }");
        assert_eq!(req.operation_name.as_deref(), Some("Q"));
    }

    #[test]
    fn decode_request_missing_query_fails() {
        let payload = json!({"operationName": "Q"});
        let err = decode_request("op_1", &payload).unwrap_err();
        assert_eq!(err.operation_id, "op_1");
        assert!(err.to_string().contains("op_1"));
    }

    #[test]
    fn decode_request_non_object_payload_fails() {
        assert!(decode_request("op_1", &json!("just a string")).is_err());
        assert!(decode_request("op_1", &json!(null)).is_err());
    }

    #[test]
    fn decode_error_mentions_envelope() {
        let err = decode_frame("{").unwrap_err();
        assert!(err.to_string().contains("invalid message envelope"));
    }
}
