use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use bytes::Bytes;
use futures::StreamExt;
use regex::Regex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::channel::{CommandChannel, DEFAULT_REQUEST_TIMEOUT, FrameSink};
use crate::error::GpError;
use crate::info::DeviceInfo;
use crate::protocol::{
    CAMERA_SERVICE_UUID, CHAR_AP_PASSWORD, CHAR_AP_SSID, CHAR_AP_STATE, CHAR_COMMAND_REQ,
    CHAR_COMMAND_RES, CHAR_KEEPALIVE_REQ, CHAR_KEEPALIVE_RES, Command, KEEPALIVE_PAYLOAD,
    LocalDate, characteristic_uuid,
};
use crate::registry::ListenerRegistry;
use crate::timing::deadline;

const POWER_ON_TIMEOUT: Duration = Duration::from_millis(1000);
const SCAN_TIMEOUT: Duration = Duration::from_millis(3000);
const AP_STATE_TIMEOUT: Duration = Duration::from_millis(3000);
const AP_STATE_POLL_INTERVAL: Duration = Duration::from_millis(100);
const ADAPTER_POLL_INTERVAL: Duration = Duration::from_millis(50);
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(3000);

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^GoPro [A-Z0-9]{4}$").unwrap());

/// Credentials for the camera's access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApCredentials {
    pub ssid: String,
    pub password: String,
}

/// The AP-configuration characteristics, read directly rather than through a
/// command channel.
struct ApCharacteristics {
    ssid: Characteristic,
    password: Characteristic,
    state: Characteristic,
}

/// Immutable binding from logical channel to discovered characteristics,
/// built once per session.
struct ServiceMap {
    ap: ApCharacteristics,
    command: Arc<CommandChannel>,
    keepalive: Arc<CommandChannel>,
}

/// Frame sink writing to one request characteristic.
struct BleFrameSink {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

#[async_trait::async_trait]
impl FrameSink for BleFrameSink {
    async fn write_frame(&self, frame: Vec<u8>) -> Result<(), GpError> {
        self.peripheral
            .write(&self.characteristic, &frame, WriteType::WithResponse)
            .await?;
        Ok(())
    }
}

struct Live {
    peripheral: Peripheral,
    services: ServiceMap,
    router: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

/// A connected camera session.
///
/// The handle owns the BLE link, the service map, the notification router and
/// the heartbeat task. Operations on a disconnected handle fail with
/// [`GpError::NoActiveSession`].
pub struct Camera {
    live: Option<Live>,
}

impl Camera {
    /// Discover, connect and set up a session with a camera.
    ///
    /// With `target_id` the advertised name must be exactly `GoPro <id>`;
    /// without it any `GoPro XXXX` (four alphanumerics) matches. The first
    /// match wins and scanning stops.
    pub async fn connect(target_id: Option<&str>) -> Result<Self, GpError> {
        let manager = Manager::new().await?;
        let adapter = wait_for_adapter(&manager).await?;
        let peripheral = scan_for_camera(&adapter, target_id).await?;

        peripheral.connect().await?;
        let live = match build_session(&peripheral).await {
            Ok(live) => live,
            Err(err) => {
                // Never leave a half-initialized session behind.
                if let Err(err) = peripheral.disconnect().await {
                    warn!(%err, "teardown disconnect failed");
                }
                return Err(err);
            }
        };
        info!("session established");
        Ok(Self { live: Some(live) })
    }

    fn live(&self) -> Result<&Live, GpError> {
        self.live.as_ref().ok_or(GpError::NoActiveSession)
    }

    /// Close the connection and stop the heartbeat and notification router.
    pub async fn disconnect(&mut self) -> Result<(), GpError> {
        let live = self.live.take().ok_or(GpError::NoActiveSession)?;
        live.heartbeat.abort();
        live.router.abort();
        live.peripheral.disconnect().await?;
        info!("session closed");
        Ok(())
    }

    /// Issue a control command on the Command endpoint pair and collect its
    /// response packets. The sole primitive under every control operation.
    async fn command(&self, command: Command) -> Result<Vec<Bytes>, GpError> {
        let live = self.live()?;
        debug!(?command, "issuing command");
        live.services
            .command
            .request(
                &command.payload(),
                command.response_packets(),
                DEFAULT_REQUEST_TIMEOUT,
            )
            .await
    }

    /// Turn the access point on, wait for it to come up, and read its
    /// credentials.
    pub async fn enable_ap(&self) -> Result<ApCredentials, GpError> {
        let live = self.live()?;
        self.command(Command::SetApState(true)).await?;

        // The camera reports readiness through the AP state characteristic;
        // poll it under a deadline, yielding between reads.
        deadline(AP_STATE_TIMEOUT, async {
            loop {
                let state = live.peripheral.read(&live.services.ap.state).await?;
                if state.first().copied().unwrap_or(0) != 0 {
                    return Ok(());
                }
                tokio::time::sleep(AP_STATE_POLL_INTERVAL).await;
            }
        })
        .await?;

        let (ssid, password) = tokio::try_join!(
            live.peripheral.read(&live.services.ap.ssid),
            live.peripheral.read(&live.services.ap.password),
        )?;
        Ok(ApCredentials {
            ssid: String::from_utf8_lossy(&ssid).into_owned(),
            password: String::from_utf8_lossy(&password).into_owned(),
        })
    }

    /// Turn the access point off. Does not wait for state confirmation.
    pub async fn disable_ap(&self) -> Result<(), GpError> {
        self.command(Command::SetApState(false)).await?;
        Ok(())
    }

    /// Push the host's local date, time, timezone and DST flag to the camera.
    pub async fn set_clock(&self) -> Result<(), GpError> {
        self.command(Command::SetLocalDate(LocalDate::now())).await?;
        Ok(())
    }

    /// Power the camera down.
    pub async fn sleep(&self) -> Result<(), GpError> {
        self.command(Command::Sleep).await?;
        Ok(())
    }

    /// Query the camera's hardware identity.
    pub async fn info(&self) -> Result<DeviceInfo, GpError> {
        let packets = self.command(Command::GetHardwareInfo).await?;
        DeviceInfo::decode(&packets)
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Some(live) = &self.live {
            live.heartbeat.abort();
            live.router.abort();
        }
    }
}

/// Wait for the radio to be usable: the first adapter that shows up wins.
async fn wait_for_adapter(manager: &Manager) -> Result<Adapter, GpError> {
    deadline(POWER_ON_TIMEOUT, async {
        loop {
            if let Some(adapter) = manager.adapters().await?.into_iter().next() {
                return Ok(adapter);
            }
            tokio::time::sleep(ADAPTER_POLL_INTERVAL).await;
        }
    })
    .await
}

fn matches_camera_name(name: &str, target_id: Option<&str>) -> bool {
    match target_id {
        Some(id) => name == format!("GoPro {id}"),
        None => NAME_PATTERN.is_match(name),
    }
}

/// Scan for a camera advertising the GoPro service whose name matches.
async fn scan_for_camera(
    adapter: &Adapter,
    target_id: Option<&str>,
) -> Result<Peripheral, GpError> {
    let mut events = adapter.events().await?;
    adapter
        .start_scan(ScanFilter {
            services: vec![CAMERA_SERVICE_UUID],
        })
        .await?;

    let found = deadline(SCAN_TIMEOUT, async {
        while let Some(event) = events.next().await {
            let id = match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                _ => continue,
            };
            let peripheral = adapter.peripheral(&id).await?;
            let Some(properties) = peripheral.properties().await? else {
                continue;
            };
            let Some(name) = properties.local_name else {
                continue;
            };
            if matches_camera_name(&name, target_id) {
                info!(%name, "matched camera");
                return Ok(peripheral);
            }
            trace!(%name, "ignoring peripheral");
        }
        Err(GpError::DeviceNotFound)
    })
    .await;

    // First match or deadline: either way the scan stops here.
    if let Err(err) = adapter.stop_scan().await {
        warn!(%err, "failed to stop scan");
    }
    found
}

fn find_characteristic(
    characteristics: &BTreeSet<Characteristic>,
    short: u16,
) -> Result<Characteristic, GpError> {
    let uuid = characteristic_uuid(short);
    characteristics
        .iter()
        .find(|c| c.uuid == uuid)
        .cloned()
        .ok_or_else(|| GpError::Transport(format!("characteristic {uuid} not found")))
}

fn channel(
    peripheral: &Peripheral,
    request: Characteristic,
    registry: Arc<ListenerRegistry>,
) -> Arc<CommandChannel> {
    Arc::new(CommandChannel::new(
        Box::new(BleFrameSink {
            peripheral: peripheral.clone(),
            characteristic: request,
        }),
        registry,
    ))
}

/// Discover characteristics, build the service map, subscribe to both
/// response endpoints and start the router and heartbeat tasks.
async fn build_session(peripheral: &Peripheral) -> Result<Live, GpError> {
    peripheral.discover_services().await?;
    let characteristics = peripheral.characteristics();

    let ap = ApCharacteristics {
        ssid: find_characteristic(&characteristics, CHAR_AP_SSID)?,
        password: find_characteristic(&characteristics, CHAR_AP_PASSWORD)?,
        state: find_characteristic(&characteristics, CHAR_AP_STATE)?,
    };
    let command_req = find_characteristic(&characteristics, CHAR_COMMAND_REQ)?;
    let command_res = find_characteristic(&characteristics, CHAR_COMMAND_RES)?;
    let keepalive_req = find_characteristic(&characteristics, CHAR_KEEPALIVE_REQ)?;
    let keepalive_res = find_characteristic(&characteristics, CHAR_KEEPALIVE_RES)?;

    let command = channel(peripheral, command_req, Arc::new(ListenerRegistry::new()));
    let keepalive = channel(peripheral, keepalive_req, Arc::new(ListenerRegistry::new()));

    peripheral.subscribe(&command_res).await?;
    peripheral.subscribe(&keepalive_res).await?;

    // One notification stream covers both response endpoints; the router fans
    // each packet into the owning channel's registry.
    let mut notifications = peripheral.notifications().await?;
    let router = {
        let command_registry = command.registry().clone();
        let keepalive_registry = keepalive.registry().clone();
        let command_res_uuid = command_res.uuid;
        let keepalive_res_uuid = keepalive_res.uuid;
        tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                let packet = Bytes::from(notification.value);
                if notification.uuid == command_res_uuid {
                    command_registry.dispatch(packet);
                } else if notification.uuid == keepalive_res_uuid {
                    keepalive_registry.dispatch(packet);
                } else {
                    trace!(uuid = %notification.uuid, "notification on unmapped characteristic");
                }
            }
        })
    };

    let services = ServiceMap {
        ap,
        command,
        keepalive,
    };

    // Fire-and-forget keepalive; its only job is stopping the link from
    // idling out.
    let heartbeat = {
        let keepalive = services.keepalive.clone();
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + HEARTBEAT_INTERVAL;
            let mut ticker = tokio::time::interval_at(start, HEARTBEAT_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = keepalive
                    .request(&KEEPALIVE_PAYLOAD, 1, DEFAULT_REQUEST_TIMEOUT)
                    .await
                {
                    debug!(%err, "keepalive dropped");
                }
            }
        })
    };

    Ok(Live {
        peripheral: peripheral.clone(),
        services,
        router,
        heartbeat,
    })
}
