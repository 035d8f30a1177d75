//! The four wire transports a [`super::CommunicationChannel`] can bind to (§4.4).

use std::collections::HashMap;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

use crate::client::DockerClient;
use crate::orch_error::{OrchError, OrchResult};

use super::message::Message;

const LIVENESS_TIMEOUT: Duration = Duration::from_secs(1);

/// TCP or UDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketProtocol {
    Tcp,
    Udp,
}

/// Per-transport configuration recognized when configuring a channel.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TransportConfig {
    /// Redis-backed publish/subscribe.
    KvBroker {
        host: String,
        port: u16,
        database: i64,
        password: Option<String>,
    },
    /// Direct TCP or UDP connection, opened fresh per publish.
    DirectSocket {
        protocol: SocketProtocol,
        host: String,
        port: u16,
    },
    /// Write-to-temp-file over the control channel of an attached Docker network.
    RuntimeNetwork { network_name: String },
    /// Write-to-file on a shared Docker volume.
    SharedVolume {
        volume_name: String,
        mount_path: String,
    },
}

impl TransportConfig {
    /// A short tag for logging and `ChannelInfo`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KvBroker { .. } => "kv-broker",
            Self::DirectSocket { .. } => "direct-socket",
            Self::RuntimeNetwork { .. } => "runtime-network",
            Self::SharedVolume { .. } => "shared-volume",
        }
    }

    /// Publish `message` over this transport to `participants` (§4.4's publish semantics).
    pub async fn publish(
        &self,
        channel: &str,
        message: &Message,
        participants: &[String],
        client: &DockerClient,
    ) -> OrchResult<()> {
        match self {
            Self::KvBroker { host, port, database, password } => {
                publish_kv_broker(channel, message, host, *port, *database, password.as_deref()).await
            }
            Self::DirectSocket { protocol, host, port } => {
                publish_direct_socket(channel, message, *protocol, host, *port).await
            }
            Self::RuntimeNetwork { .. } => {
                publish_runtime_network(channel, message, participants, client).await
            }
            Self::SharedVolume { mount_path, .. } => {
                publish_shared_volume(channel, message, participants, mount_path, client).await
            }
        }
    }

    /// Refresh-liveness check used by the background heartbeat loop (§4.4 step 1).
    pub async fn is_alive(&self, client: &DockerClient) -> bool {
        match self {
            Self::KvBroker { host, port, database, password } => {
                kv_broker_ping(host, *port, *database, password.as_deref()).await
            }
            Self::DirectSocket { protocol, host, port } => {
                socket_is_reachable(*protocol, host, *port).await
            }
            Self::RuntimeNetwork { network_name } => {
                client.networks().get_by_name(network_name).await.ok().flatten().is_some()
            }
            Self::SharedVolume { volume_name, .. } => {
                client.volumes().get_by_name(volume_name).await.ok().flatten().is_some()
            }
        }
    }
}

async fn publish_kv_broker(
    channel: &str,
    message: &Message,
    host: &str,
    port: u16,
    database: i64,
    password: Option<&str>,
) -> OrchResult<()> {
    let client = redis_client(host, port, database, password)
        .map_err(|e| OrchError::transport(channel, e.to_string()))?;
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| OrchError::transport(channel, e.to_string()))?;
    let payload = message
        .to_json()
        .map_err(|e| OrchError::transport(channel, e.to_string()))?;
    let _subscribers: i64 = redis::cmd("PUBLISH")
        .arg(format!("smoothstack:comm:{channel}"))
        .arg(payload)
        .query_async(&mut conn)
        .await
        .map_err(|e| OrchError::transport(channel, e.to_string()))?;
    Ok(())
}

async fn kv_broker_ping(host: &str, port: u16, database: i64, password: Option<&str>) -> bool {
    let Ok(client) = redis_client(host, port, database, password) else {
        return false;
    };
    let Ok(mut conn) = client.get_multiplexed_async_connection().await else {
        return false;
    };
    let probe = async {
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong
    };
    match tokio::time::timeout(LIVENESS_TIMEOUT, probe).await {
        Ok(result) => result.is_ok(),
        Err(_) => false,
    }
}

fn redis_client(
    host: &str,
    port: u16,
    database: i64,
    password: Option<&str>,
) -> redis::RedisResult<redis::Client> {
    let auth = password
        .map(|p| format!(":{p}@"))
        .unwrap_or_default();
    redis::Client::open(format!("redis://{auth}{host}:{port}/{database}"))
}

async fn publish_direct_socket(
    channel: &str,
    message: &Message,
    protocol: SocketProtocol,
    host: &str,
    port: u16,
) -> OrchResult<()> {
    let payload = message
        .to_json()
        .map_err(|e| OrchError::transport(channel, e.to_string()))?;
    match protocol {
        SocketProtocol::Tcp => {
            let mut stream = TcpStream::connect((host, port))
                .await
                .map_err(|e| OrchError::transport(channel, e.to_string()))?;
            stream
                .write_all(payload.as_bytes())
                .await
                .map_err(|e| OrchError::transport(channel, e.to_string()))?;
            stream
                .shutdown()
                .await
                .map_err(|e| OrchError::transport(channel, e.to_string()))?;
        }
        SocketProtocol::Udp => {
            let socket = UdpSocket::bind("0.0.0.0:0")
                .await
                .map_err(|e| OrchError::transport(channel, e.to_string()))?;
            socket
                .send_to(payload.as_bytes(), (host, port))
                .await
                .map_err(|e| OrchError::transport(channel, e.to_string()))?;
        }
    }
    Ok(())
}

/// Always probes over TCP regardless of the channel's configured protocol:
/// liveness is about whether `(host, port)` is reachable at all, and a UDP
/// socket bound to an ephemeral local port would tell us nothing about that.
async fn socket_is_reachable(_protocol: SocketProtocol, host: &str, port: u16) -> bool {
    tokio::time::timeout(LIVENESS_TIMEOUT, TcpStream::connect((host, port)))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

/// Write targets a diagnostic-only path inside each participant; no component
/// reads it back (§4.4's resolved runtime-network open question).
async fn publish_runtime_network(
    channel: &str,
    message: &Message,
    participants: &[String],
    client: &DockerClient,
) -> OrchResult<()> {
    let payload = message
        .to_json()
        .map_err(|e| OrchError::transport(channel, e.to_string()))?;
    let path = format!("/tmp/smoothstack_comm_{channel}");
    let executor = crate::container::ContainerExecutor::new(client);

    let mut last_err = None;
    for participant in participants {
        let id = crate::types::ContainerId::new_unchecked(participant.clone());
        let write = vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("cat > {path} <<'SMOOTHSTACK_EOF'\n{payload}\nSMOOTHSTACK_EOF"),
        ];
        if let Err(e) = executor.exec_simple(&id, write).await {
            last_err = Some(e);
        }
    }
    match last_err {
        Some(e) if participants.len() == 1 => Err(OrchError::transport(channel, e.to_string())),
        _ => Ok(()),
    }
}

async fn publish_shared_volume(
    channel: &str,
    message: &Message,
    participants: &[String],
    mount_path: &str,
    client: &DockerClient,
) -> OrchResult<()> {
    let Some(first) = participants.first() else {
        return Err(OrchError::transport(channel, "no participants configured"));
    };
    let payload = message
        .to_json()
        .map_err(|e| OrchError::transport(channel, e.to_string()))?;
    let dir = format!("{mount_path}/messages");
    let file = format!("{dir}/{}.json", message.id);
    let id = crate::types::ContainerId::new_unchecked(first.clone());
    let write = vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("mkdir -p {dir} && cat > {file} <<'SMOOTHSTACK_EOF'\n{payload}\nSMOOTHSTACK_EOF"),
    ];
    let executor = crate::container::ContainerExecutor::new(client);
    executor
        .exec_simple(&id, write)
        .await
        .map_err(|e| OrchError::transport(channel, e.to_string()))?;
    Ok(())
}

/// Snapshot of a transport's recognized configuration, returned by `ChannelInfo`.
#[must_use]
pub fn describe(config: &TransportConfig) -> HashMap<String, String> {
    let mut out = HashMap::new();
    match config {
        TransportConfig::KvBroker { host, port, database, .. } => {
            out.insert("host".to_string(), host.clone());
            out.insert("port".to_string(), port.to_string());
            out.insert("database".to_string(), database.to_string());
        }
        TransportConfig::DirectSocket { protocol, host, port } => {
            out.insert("protocol".to_string(), format!("{protocol:?}").to_lowercase());
            out.insert("host".to_string(), host.clone());
            out.insert("port".to_string(), port.to_string());
        }
        TransportConfig::RuntimeNetwork { network_name } => {
            out.insert("network_name".to_string(), network_name.clone());
        }
        TransportConfig::SharedVolume { volume_name, mount_path } => {
            out.insert("volume_name".to_string(), volume_name.clone());
            out.insert("mount_path".to_string(), mount_path.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_kinds_are_tagged() {
        assert_eq!(
            TransportConfig::KvBroker {
                host: "localhost".to_string(),
                port: 6379,
                database: 0,
                password: None,
            }
            .kind(),
            "kv-broker"
        );
        assert_eq!(
            TransportConfig::DirectSocket {
                protocol: SocketProtocol::Tcp,
                host: "localhost".to_string(),
                port: 9000,
            }
            .kind(),
            "direct-socket"
        );
    }

    #[test]
    fn describe_surfaces_socket_fields() {
        let config = TransportConfig::DirectSocket {
            protocol: SocketProtocol::Udp,
            host: "10.0.0.1".to_string(),
            port: 5000,
        };
        let fields = describe(&config);
        assert_eq!(fields.get("protocol").map(String::as_str), Some("udp"));
        assert_eq!(fields.get("port").map(String::as_str), Some("5000"));
    }
}
