//! Keep-alive frame production.
//!
//! The legacy protocol proves liveness with zero-payload `ka` frames pushed
//! on a fixed cadence after a successful handshake. The stream here is lazy
//! and session-scoped: the session's cancel token ends it on terminate, and
//! the transport dropping it ends it on close.

use std::time::Duration;

use futures::Stream;
use subwire_core::OperationMessage;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Produce a `ka` frame every `interval` until `cancel` fires.
///
/// The first frame is emitted one full `interval` after the stream starts
/// being polled.
pub fn keep_alive_frames(
    interval: Duration,
    cancel: CancellationToken,
) -> impl Stream<Item = OperationMessage> + Send {
    async_stream::stream! {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            yield OperationMessage::keep_alive();
        }
    }
}
