use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::GpError;
use crate::registry::ListenerRegistry;
use crate::timing::deadline;

/// Default deadline for one request/response exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);

/// Writes framed requests to one request characteristic.
#[async_trait::async_trait]
pub trait FrameSink: Send + Sync {
    async fn write_frame(&self, frame: Vec<u8>) -> Result<(), GpError>;
}

/// One request/response endpoint pair.
///
/// The wire protocol carries no request ids: the next N notifications on the
/// response endpoint belong to whoever wrote last. The internal mutex keeps a
/// single request in flight per pair, which is what makes the count-based
/// correlation sound.
pub struct CommandChannel {
    sink: Box<dyn FrameSink>,
    registry: Arc<ListenerRegistry>,
    in_flight: Mutex<()>,
}

impl CommandChannel {
    pub fn new(sink: Box<dyn FrameSink>, registry: Arc<ListenerRegistry>) -> Self {
        Self {
            sink,
            registry,
            in_flight: Mutex::new(()),
        }
    }

    /// The registry incoming notifications for this pair are dispatched into.
    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// Write `payload` framed as a length byte plus the payload bytes, then
    /// collect exactly `expected_packets` notifications in arrival order.
    ///
    /// The whole exchange is bounded by `timeout`; on expiry the (possibly
    /// partially filled) listener is removed without resolving.
    pub async fn request(
        &self,
        payload: &[u8],
        expected_packets: usize,
        timeout: Duration,
    ) -> Result<Vec<Bytes>, GpError> {
        if payload.len() > u8::MAX as usize {
            return Err(GpError::Protocol(format!(
                "payload of {} bytes does not fit a one-byte length prefix",
                payload.len()
            )));
        }

        let _guard = self.in_flight.lock().await;
        let (listener, mut rx) = self.registry.register();

        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.push(payload.len() as u8);
        frame.extend_from_slice(payload);

        let exchange = async {
            self.sink.write_frame(frame).await?;
            let mut packets = Vec::with_capacity(expected_packets);
            while packets.len() < expected_packets {
                match rx.recv().await {
                    Some(packet) => {
                        trace!(len = packet.len(), "response packet");
                        packets.push(packet);
                    }
                    None => {
                        return Err(GpError::Protocol("response endpoint closed".to_string()));
                    }
                }
            }
            Ok(packets)
        };
        let result = deadline(timeout, exchange).await;
        self.registry.remove(listener);
        result
    }
}
