//! Communication Fabric (C4): named channels bound to one of four transports,
//! a publish/list/get/remove surface, and a cooperative heartbeat loop that
//! keeps each channel's `active` flag current (§4.4).

mod message;
mod transport;

pub use message::{Message, MessageType};
pub use transport::{SocketProtocol, TransportConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use crate::client::DockerClient;
use crate::orch_error::{OrchError, OrchResult};
use crate::templates::{TemplateKind, TemplateRecord, TemplateStore};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const SHUTDOWN_JOIN_DEADLINE: Duration = Duration::from_secs(2);

/// A configured channel and its runtime state. Persisted on configure and
/// reloaded at startup (§3); the `active`/`subscriber_count` fields are
/// refreshed in memory by the heartbeat loop and not re-persisted on every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationChannel {
    /// Unique channel name.
    pub name: String,
    /// Bound transport and its configuration.
    pub transport: TransportConfig,
    /// Participating container names.
    pub participants: Vec<String>,
    /// Unix-epoch milliseconds at configure time.
    pub created_at: i64,
    /// Whether the last liveness check for this channel succeeded.
    pub active: bool,
    /// How many subscribers have been recorded against this channel.
    pub subscriber_count: u32,
}

impl CommunicationChannel {
    fn new(name: String, transport: TransportConfig, participants: Vec<String>) -> Self {
        Self {
            name,
            transport,
            participants,
            created_at: chrono::Utc::now().timestamp_millis(),
            active: false,
            subscriber_count: 0,
        }
    }
}

impl TemplateRecord for CommunicationChannel {
    fn kind() -> TemplateKind {
        TemplateKind::Channel
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A read-only snapshot of a channel, returned by `list`/`get`.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    /// Channel name.
    pub name: String,
    /// Transport tag ("kv-broker", "direct-socket", "runtime-network", "shared-volume").
    pub transport_kind: &'static str,
    /// Transport-specific fields, for display.
    pub transport_fields: HashMap<String, String>,
    /// Participating container names.
    pub participants: Vec<String>,
    /// Unix-epoch milliseconds at configure time.
    pub created_at: i64,
    /// Whether the channel's last liveness check succeeded.
    pub active: bool,
    /// Recorded subscriber count.
    pub subscriber_count: u32,
}

impl From<&CommunicationChannel> for ChannelInfo {
    fn from(channel: &CommunicationChannel) -> Self {
        Self {
            name: channel.name.clone(),
            transport_kind: channel.transport.kind(),
            transport_fields: transport::describe(&channel.transport),
            participants: channel.participants.clone(),
            created_at: channel.created_at,
            active: channel.active,
            subscriber_count: channel.subscriber_count,
        }
    }
}

struct Inner {
    client: DockerClient,
    store: TemplateStore,
    channels: RwLock<HashMap<String, CommunicationChannel>>,
}

/// The Communication Fabric component (C4).
///
/// Cheap to clone: the background heartbeat loop and every channel map are
/// shared via `Arc`, matching the facade-over-shared-state shape the rest of
/// this crate uses for long-lived components.
#[derive(Clone)]
pub struct CommunicationFabric {
    inner: Arc<Inner>,
    stop_tx: Arc<watch::Sender<bool>>,
    handle: Arc<std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl CommunicationFabric {
    /// Construct a fabric over `client`, reloading any channels persisted in
    /// `store` from a previous run, and start its background heartbeat loop.
    pub async fn new(client: DockerClient, store: TemplateStore) -> OrchResult<Self> {
        let loaded = store.load_all::<CommunicationChannel>().await?;
        let mut channels = HashMap::new();
        for mut channel in loaded {
            channel.active = false;
            channels.insert(channel.name.clone(), channel);
        }

        let inner = Arc::new(Inner {
            client,
            store,
            channels: RwLock::new(channels),
        });
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(heartbeat_loop(Arc::clone(&inner), stop_rx));
        Ok(Self {
            inner,
            stop_tx: Arc::new(stop_tx),
            handle: Arc::new(std::sync::Mutex::new(Some(handle))),
        })
    }

    /// Configure a kv-broker (Redis) channel.
    pub async fn configure_kv_broker(
        &self,
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: i64,
        password: Option<String>,
        participants: Vec<String>,
    ) -> OrchResult<bool> {
        self.configure(
            name,
            TransportConfig::KvBroker {
                host: host.into(),
                port,
                database,
                password,
            },
            participants,
        )
        .await
    }

    /// Configure a direct TCP/UDP socket channel.
    pub async fn configure_direct_socket(
        &self,
        name: impl Into<String>,
        protocol: SocketProtocol,
        host: impl Into<String>,
        port: u16,
        participants: Vec<String>,
    ) -> OrchResult<bool> {
        self.configure(
            name,
            TransportConfig::DirectSocket {
                protocol,
                host: host.into(),
                port,
            },
            participants,
        )
        .await
    }

    /// Configure a runtime-network (exec-based) channel.
    pub async fn configure_runtime_network(
        &self,
        name: impl Into<String>,
        network_name: impl Into<String>,
        participants: Vec<String>,
    ) -> OrchResult<bool> {
        self.configure(
            name,
            TransportConfig::RuntimeNetwork {
                network_name: network_name.into(),
            },
            participants,
        )
        .await
    }

    /// Configure a shared-volume channel.
    pub async fn configure_shared_volume(
        &self,
        name: impl Into<String>,
        volume_name: impl Into<String>,
        mount_path: impl Into<String>,
        participants: Vec<String>,
    ) -> OrchResult<bool> {
        self.configure(
            name,
            TransportConfig::SharedVolume {
                volume_name: volume_name.into(),
                mount_path: mount_path.into(),
            },
            participants,
        )
        .await
    }

    async fn configure(
        &self,
        name: impl Into<String>,
        transport: TransportConfig,
        participants: Vec<String>,
    ) -> OrchResult<bool> {
        let name = name.into();
        {
            let channels = self.inner.channels.read().await;
            if channels.contains_key(&name) {
                return Err(OrchError::already_exists("communication channel", name));
            }
        }
        let channel = CommunicationChannel::new(name.clone(), transport, participants);
        self.inner.store.save(&channel).await?;
        self.inner.channels.write().await.insert(name, channel);
        Ok(true)
    }

    /// Publish `content` on `channel`, addressed to `targets` (empty = broadcast).
    pub async fn publish(
        &self,
        channel: &str,
        content: impl Into<String>,
        message_type: MessageType,
        source: impl Into<String>,
        targets: Vec<String>,
    ) -> OrchResult<bool> {
        let message = Message::new(message_type, content, source, targets);
        let channels = self.inner.channels.read().await;
        let record = channels
            .get(channel)
            .ok_or_else(|| OrchError::not_found("communication channel", channel))?;
        record
            .transport
            .publish(channel, &message, &record.participants, &self.inner.client)
            .await?;
        Ok(true)
    }

    /// List every configured channel.
    pub async fn list(&self) -> Vec<ChannelInfo> {
        let channels = self.inner.channels.read().await;
        channels.values().map(ChannelInfo::from).collect()
    }

    /// Look up a single channel by name.
    pub async fn get(&self, channel: &str) -> Option<ChannelInfo> {
        let channels = self.inner.channels.read().await;
        channels.get(channel).map(ChannelInfo::from)
    }

    /// Remove a channel by name.
    pub async fn remove(&self, channel: &str) -> OrchResult<bool> {
        {
            let mut channels = self.inner.channels.write().await;
            channels
                .remove(channel)
                .ok_or_else(|| OrchError::not_found("communication channel", channel))?;
        }
        let _ = self
            .inner
            .store
            .delete::<CommunicationChannel>(channel)
            .await;
        Ok(true)
    }

    /// Stop the background heartbeat loop and wait for it to exit, up to a
    /// 2 s deadline (§4.4's cancellation contract).
    pub async fn shutdown(&self) -> OrchResult<()> {
        let _ = self.stop_tx.send(true);
        let handle = self.handle.lock().expect("heartbeat handle mutex poisoned").take();
        let Some(handle) = handle else { return Ok(()) };
        match tokio::time::timeout(SHUTDOWN_JOIN_DEADLINE, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(OrchError::internal(format!("heartbeat task panicked: {e}"))),
            Err(_) => Err(OrchError::timeout("communication fabric shutdown", SHUTDOWN_JOIN_DEADLINE)),
        }
    }
}

async fn heartbeat_loop(inner: Arc<Inner>, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_heartbeat_cycle(&inner).await;
            }
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    debug!("communication fabric heartbeat loop stopping");
                    return;
                }
            }
        }
    }
}

async fn run_heartbeat_cycle(inner: &Arc<Inner>) {
    let names: Vec<String> = {
        let channels = inner.channels.read().await;
        channels.keys().cloned().collect()
    };

    for name in names {
        let alive = {
            let channels = inner.channels.read().await;
            let Some(channel) = channels.get(&name) else { continue };
            channel.transport.is_alive(&inner.client).await
        };

        {
            let mut channels = inner.channels.write().await;
            if let Some(channel) = channels.get_mut(&name) {
                channel.active = alive;
            }
        }

        if alive {
            let (transport, participants) = {
                let channels = inner.channels.read().await;
                let Some(channel) = channels.get(&name) else { continue };
                (channel.transport.clone(), channel.participants.clone())
            };
            let heartbeat = Message::heartbeat();
            if let Err(e) = transport.publish(&name, &heartbeat, &participants, &inner.client).await {
                warn!("heartbeat publish failed on channel {name}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // These exercise `CommunicationFabric` end-to-end, which needs a real
    // Docker binary on PATH to construct a `DockerClient`. They're `#[serial]`
    // because they all talk to the same local Docker daemon.
    async fn test_client() -> DockerClient {
        DockerClient::new_unchecked()
            .await
            .expect("docker binary on PATH")
    }

    async fn test_fabric() -> (CommunicationFabric, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());
        let fabric = CommunicationFabric::new(test_client().await, store).await.unwrap();
        (fabric, dir)
    }

    #[tokio::test]
    #[ignore = "requires a local docker daemon"]
    #[serial]
    async fn configure_rejects_duplicate_names() {
        let (fabric, _dir) = test_fabric().await;
        fabric
            .configure_direct_socket("ch1", SocketProtocol::Tcp, "localhost", 9000, vec![])
            .await
            .unwrap();
        let err = fabric
            .configure_direct_socket("ch1", SocketProtocol::Tcp, "localhost", 9001, vec![])
            .await
            .unwrap_err();
        assert_eq!(err.category(), "already_exists");
        fabric.shutdown().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a local docker daemon"]
    #[serial]
    async fn publish_on_unknown_channel_is_not_found() {
        let (fabric, _dir) = test_fabric().await;
        let err = fabric
            .publish("missing", "hi", MessageType::Data, "svc-a", vec![])
            .await
            .unwrap_err();
        assert_eq!(err.category(), "not_found");
        fabric.shutdown().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a local docker daemon"]
    #[serial]
    async fn remove_then_get_is_none() {
        let (fabric, _dir) = test_fabric().await;
        fabric
            .configure_shared_volume("ch1", "vol1", "/data", vec!["svc-a".to_string()])
            .await
            .unwrap();
        assert!(fabric.get("ch1").await.is_some());
        fabric.remove("ch1").await.unwrap();
        assert!(fabric.get("ch1").await.is_none());
        fabric.shutdown().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a local docker daemon"]
    #[serial]
    async fn shutdown_joins_within_deadline() {
        let (fabric, _dir) = test_fabric().await;
        fabric.shutdown().await.unwrap();
    }
}
