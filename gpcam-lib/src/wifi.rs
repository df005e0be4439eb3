use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::GpError;
use crate::timing::deadline;

/// Bound on how long a join may take before the host must report the
/// connection as established.
pub const JOIN_TIMEOUT: Duration = Duration::from_millis(5000);

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Host Wi-Fi stack contract: join the camera's access point, drop it
/// afterwards. Implementations live outside this crate; the protocol engine
/// only depends on this seam.
#[async_trait]
pub trait NetworkJoin {
    /// Join `ssid` on `interface` (or the default interface), returning once
    /// the host reports an established connection within [`JOIN_TIMEOUT`].
    async fn connect(
        &self,
        interface: Option<&str>,
        ssid: &str,
        password: &str,
    ) -> Result<(), GpError>;

    /// Drop the connection.
    async fn disconnect(&self) -> Result<(), GpError>;
}

/// Poll `probe` until it reports the connection as established, sleeping
/// between iterations, bounded by `limit`.
pub async fn wait_for_connection<F, Fut>(limit: Duration, mut probe: F) -> Result<(), GpError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, GpError>>,
{
    deadline(limit, async {
        loop {
            if probe().await? {
                return Ok(());
            }
            tokio::time::sleep(JOIN_POLL_INTERVAL).await;
        }
    })
    .await
}
