//! Transport seam.
//!
//! The embedding server owns the actual WebSocket. The protocol engine only
//! needs a stable connection id and a way to close the peer; everything
//! else (framing, upgrades, backpressure on the sink) stays outside.

/// Handle to the underlying connection, supplied by the transport layer.
pub trait Transport: Send + Sync {
    /// Stable identifier for this connection.
    fn id(&self) -> &str;

    /// Close the underlying connection.
    ///
    /// The session forwards at most one call, so implementations need not
    /// guard against reentry themselves.
    fn close(&self);
}
