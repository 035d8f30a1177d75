//! Network Manager (C3): template-driven network provisioning, container
//! attachment, and cross-container reachability probing.

use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::client::DockerClient;
use crate::network::{ConnectOptions, DisconnectOptions, NetworkConfig};
use crate::orch_error::{OrchError, OrchResult};
use crate::templates::NetworkTemplate;
use crate::types::{ContainerId, NetworkId};

/// Overrides applied over a [`NetworkTemplate`] when provisioning a network from it (§4.3).
#[derive(Debug, Clone, Default)]
pub struct NetworkOverrides {
    /// Override the network name (falls back to the template name if unset).
    pub name: Option<String>,
    /// Override the driver.
    pub driver: Option<crate::network::NetworkDriver>,
    /// Override the subnet.
    pub subnet: Option<String>,
    /// Override the gateway.
    pub gateway: Option<String>,
    /// Additional driver options, merged over the template's.
    pub options: HashMap<String, String>,
    /// Additional labels, unioned with the template's.
    pub labels: HashMap<String, String>,
}

/// A normalized reachability-probe outcome (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityResult {
    /// Network the probe succeeded over.
    pub network: String,
    /// Target's IPv4 address on that network.
    pub address: String,
}

/// Normalized network inspection record (§4.3's "Inspect" operation).
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    /// Network ID.
    pub id: NetworkId,
    /// Network name.
    pub name: String,
    /// Driver name.
    pub driver: String,
    /// Scope (e.g. "local").
    pub scope: String,
    /// Whether the network is internal.
    pub internal: bool,
    /// Subnet, if configured.
    pub subnet: Option<String>,
    /// Gateway, if configured.
    pub gateway: Option<String>,
    /// Connected containers: name -> (id, mac, ipv4, ipv6).
    pub containers: HashMap<String, ConnectedContainer>,
    /// Labels.
    pub labels: HashMap<String, String>,
    /// Driver options.
    pub options: HashMap<String, String>,
}

/// A container's attachment record within a [`NetworkInfo`].
#[derive(Debug, Clone)]
pub struct ConnectedContainer {
    /// Endpoint ID on the network.
    pub id: String,
    /// MAC address.
    pub mac: String,
    /// IPv4 address, if assigned.
    pub ipv4: Option<String>,
    /// IPv6 address, if assigned.
    pub ipv6: Option<String>,
}

/// The Network Manager component (C3): create/inspect/delete networks,
/// attach/detach containers, and probe reachability between them.
pub struct NetworkOrchestrator<'a> {
    client: &'a DockerClient,
}

impl<'a> NetworkOrchestrator<'a> {
    /// Construct a network orchestrator over `client`.
    #[must_use]
    pub fn new(client: &'a DockerClient) -> Self {
        Self { client }
    }

    /// Idempotently create a network by name. Returns the existing network's
    /// id if one with that name is already present.
    pub async fn create(&self, config: NetworkConfig) -> OrchResult<NetworkId> {
        if let Some(existing) = self.client.networks().get_by_name(&config.name).await? {
            debug!("network {} already exists, returning existing id", config.name);
            return Ok(existing.id);
        }
        Ok(self.client.networks().create(config).await?)
    }

    /// Create a network from a template, merging `overrides` over the
    /// template's values (§4.3, §8's override-merge invariant).
    pub async fn create_from_template(
        &self,
        template: &NetworkTemplate,
        overrides: NetworkOverrides,
    ) -> OrchResult<NetworkId> {
        let name = overrides.name.clone().unwrap_or_else(|| template.name.clone());
        let driver = overrides.driver.clone().unwrap_or_else(|| template.driver.clone());
        let subnet = overrides.subnet.or_else(|| template.subnet.clone());
        let gateway = overrides.gateway.or_else(|| template.gateway.clone());

        let mut options = template.options.clone();
        options.extend(overrides.options);

        let mut labels = template.labels.clone();
        labels.extend(overrides.labels);

        let mut config = NetworkConfig::new(name).driver(driver);
        for (k, v) in options {
            config = config.option(k, v);
        }
        for (k, v) in labels {
            config = config.label(k, v);
        }
        if template.internal {
            config = config.internal();
        }
        if template.enable_ipv6 {
            config = config.enable_ipv6();
        }
        if let Some(subnet) = subnet {
            config = config.subnet(subnet);
        }
        if let Some(gateway) = gateway {
            config = config.gateway(gateway);
        }

        self.create(config).await
    }

    /// Remove a network by name; fails with `NotFound` if it does not exist (§4.3).
    pub async fn delete(&self, name: &str) -> OrchResult<()> {
        let network = self
            .client
            .networks()
            .get_by_name(name)
            .await?
            .ok_or_else(|| OrchError::not_found("network", name))?;
        self.client.networks().remove(&network.id).await?;
        Ok(())
    }

    /// Attach a container to a network, with an optional fixed IPv4 and aliases.
    pub async fn attach(
        &self,
        network_name: &str,
        container_id: &ContainerId,
        ipv4: Option<std::net::Ipv4Addr>,
        aliases: Vec<String>,
    ) -> OrchResult<()> {
        let network = self
            .client
            .networks()
            .get_by_name(network_name)
            .await?
            .ok_or_else(|| OrchError::not_found("network", network_name))?;

        let mut options = ConnectOptions::default();
        options.aliases = aliases;
        if let Some(ip) = ipv4 {
            options.ipv4_address = Some(std::net::IpAddr::V4(ip));
        }

        self.client
            .networks()
            .connect(&network.id, container_id, Some(options))
            .await?;
        Ok(())
    }

    /// Detach a container from a network.
    pub async fn detach(&self, network_name: &str, container_id: &ContainerId) -> OrchResult<()> {
        let network = self
            .client
            .networks()
            .get_by_name(network_name)
            .await?
            .ok_or_else(|| OrchError::not_found("network", network_name))?;
        self.client
            .networks()
            .disconnect(&network.id, container_id, Some(DisconnectOptions::default()))
            .await?;
        Ok(())
    }

    /// Return a normalized inspection record for a network.
    pub async fn inspect(&self, name: &str) -> OrchResult<NetworkInfo> {
        let network = self
            .client
            .networks()
            .get_by_name(name)
            .await?
            .ok_or_else(|| OrchError::not_found("network", name))?;
        let inspect = self.client.networks().inspect(&network.id).await?;

        let subnet = inspect.ipam.config.as_ref().and_then(|cfgs| {
            cfgs.iter().find_map(|c| c.subnet.clone())
        });
        let gateway = inspect.ipam.config.as_ref().and_then(|cfgs| {
            cfgs.iter().find_map(|c| c.gateway.clone())
        });

        let containers = inspect
            .containers
            .into_iter()
            .map(|(_, c)| {
                (
                    c.name.clone(),
                    ConnectedContainer {
                        id: c.endpoint_id,
                        mac: c.mac_address,
                        ipv4: non_empty(c.ipv4_address),
                        ipv6: non_empty(c.ipv6_address),
                    },
                )
            })
            .collect();

        Ok(NetworkInfo {
            id: inspect.id,
            name: inspect.name,
            driver: inspect.driver,
            scope: inspect.scope,
            internal: inspect.internal,
            subnet,
            gateway,
            containers,
            labels: inspect.labels,
            options: inspect.options,
        })
    }

    /// Probe reachability from `source` to `target` (§4.3). Inspects the
    /// target's attached networks, then pings the target's IP from inside
    /// `source` on each, returning the first success.
    pub async fn check_reachability(
        &self,
        source: &ContainerId,
        target: &ContainerId,
        timeout: Duration,
    ) -> OrchResult<ReachabilityResult> {
        let target_info = self.client.containers().inspect(target).await?;

        if !matches!(target_info.status, crate::types::ContainerStatus::Running { .. }) {
            return Err(OrchError::runtime(format!(
                "target container {target} is not running"
            )));
        }

        if target_info.networks.is_empty() {
            return Err(OrchError::not_found(
                "network attachment",
                format!("container {target} has no attached networks"),
            ));
        }

        let target_name = target_info.name.clone().unwrap_or_else(|| target.to_string());
        let executor = crate::container::ContainerExecutor::new(self.client);

        for network_name in &target_info.networks {
            let info = match self.inspect(network_name).await {
                Ok(info) => info,
                Err(_) => continue,
            };
            let Some(conn) = info.containers.get(&target_name) else {
                continue;
            };
            let Some(ipv4) = &conn.ipv4 else { continue };
            let address = ipv4.split('/').next().unwrap_or(ipv4).to_string();

            let ping = vec![
                "ping".to_string(),
                "-c".to_string(),
                "1".to_string(),
                address.clone(),
            ];
            let probe = tokio::time::timeout(timeout, executor.exec_simple(source, ping)).await;

            if matches!(probe, Ok(Ok(_))) {
                return Ok(ReachabilityResult {
                    network: network_name.clone(),
                    address,
                });
            }
        }

        Err(OrchError::runtime(format!(
            "no reachable network between {source} and {target}"
        )))
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_default_to_empty() {
        let overrides = NetworkOverrides::default();
        assert!(overrides.name.is_none());
        assert!(overrides.options.is_empty());
    }
}
