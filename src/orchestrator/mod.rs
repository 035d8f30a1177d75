//! Service Orchestrator (C5): parses and validates service groups, computes
//! deployment order, and drives deploy/start/stop/remove against C1 and C3 (§4.5).

mod model;

pub use model::{
    topological_order, DependencyCondition, GroupStatus, Service, ServiceDependency, ServiceGroup,
    ServiceNetwork,
};

use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::DockerClient;
use crate::container::ContainerConfig;
use crate::net_manager::NetworkOrchestrator;
use crate::network::NetworkConfig;
use crate::orch_error::{OrchError, OrchResult};
use crate::templates::TemplateStore;
use crate::types::{ContainerStatus, VolumeMount, VolumeSource};

const DEFAULT_HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_HEALTH_RETRIES: u32 = 10;
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a single step within [`ServiceOrchestrator::deploy`] or
/// [`ServiceOrchestrator::start`].
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The service or network this step concerned.
    pub name: String,
    /// Whether the step succeeded.
    pub success: bool,
    /// Human-readable detail.
    pub message: String,
}

/// The Service Orchestrator component (C5).
pub struct ServiceOrchestrator<'a> {
    client: &'a DockerClient,
    store: &'a TemplateStore,
}

impl<'a> ServiceOrchestrator<'a> {
    /// Construct an orchestrator over `client`, persisting groups in `store`.
    #[must_use]
    pub fn new(client: &'a DockerClient, store: &'a TemplateStore) -> Self {
        Self { client, store }
    }

    /// Parse-and-validate a group, then persist it. Rejects invalid groups
    /// without writing anything (§4.5's Parse & validate).
    pub async fn save(&self, group: &ServiceGroup) -> OrchResult<()> {
        let errors = group.validate();
        if !errors.is_empty() {
            return Err(OrchError::validation(errors.join("; ")));
        }
        self.store.save(group).await
    }

    /// Load a previously saved group.
    pub async fn load(&self, name: &str) -> OrchResult<ServiceGroup> {
        self.store.get(name).await
    }

    /// List every saved group.
    pub async fn list(&self) -> OrchResult<Vec<ServiceGroup>> {
        self.store.list().await
    }

    /// Delete a saved group. Does not touch any running resources; callers
    /// should [`Self::remove`] first if containers are still deployed.
    pub async fn delete(&self, name: &str) -> OrchResult<()> {
        self.store.delete::<ServiceGroup>(name).await
    }

    /// Idempotently materialize every network and container the group needs,
    /// without starting any of them (§4.5's Deploy).
    pub async fn deploy(&self, group: &ServiceGroup) -> OrchResult<Vec<StepResult>> {
        let errors = group.validate();
        if !errors.is_empty() {
            return Err(OrchError::validation(errors.join("; ")));
        }

        let mut results = Vec::new();
        let net_orchestrator = NetworkOrchestrator::new(self.client);

        let mut network_names: Vec<&String> = group.networks.keys().collect();
        network_names.sort();
        for name in network_names {
            let network = &group.networks[name];
            let resolved = network.resolved_network_name(&group.name);
            let mut config = NetworkConfig::new(resolved.clone()).driver(network.driver.clone());
            if network.internal {
                config = config.internal();
            }
            if network.ipv6 {
                config = config.enable_ipv6();
            }
            if let Some(subnet) = &network.subnet {
                config = config.subnet(subnet.clone());
            }
            if let Some(gateway) = &network.gateway {
                config = config.gateway(gateway.clone());
            }
            for (k, v) in &network.labels {
                config = config.label(k.clone(), v.clone());
            }

            match net_orchestrator.create(config).await {
                Ok(_) => results.push(StepResult {
                    name: name.clone(),
                    success: true,
                    message: format!("network {resolved} ready"),
                }),
                Err(e) => results.push(StepResult {
                    name: name.clone(),
                    success: false,
                    message: e.to_string(),
                }),
            }
        }

        let order = model::topological_order(&group.services)
            .map_err(|cycle| OrchError::dependency(format!("cycle at {cycle}")))?;

        for service_name in &order {
            let service = &group.services[service_name];
            let container_name = service.resolved_container_name(&group.name);

            if self.find_container_id(&container_name).await?.is_some() {
                results.push(StepResult {
                    name: service_name.clone(),
                    success: true,
                    message: format!("container {container_name} already exists"),
                });
                continue;
            }

            let config = self.build_container_config(group, service, &container_name);
            match self.client.containers().create(config).await {
                Ok(id) => results.push(StepResult {
                    name: service_name.clone(),
                    success: true,
                    message: format!("created container {id}"),
                }),
                Err(e) => results.push(StepResult {
                    name: service_name.clone(),
                    success: false,
                    message: e.to_string(),
                }),
            }
        }

        Ok(results)
    }

    /// Start every service in topological order, honoring each dependency's
    /// condition between steps (§4.5's Start).
    pub async fn start(&self, group: &ServiceGroup) -> OrchResult<Vec<StepResult>> {
        let order = model::topological_order(&group.services)
            .map_err(|cycle| OrchError::dependency(format!("cycle at {cycle}")))?;

        let mut results = Vec::new();
        let mut failed: HashMap<String, bool> = HashMap::new();

        for service_name in &order {
            let service = &group.services[service_name];

            let mut blocked = false;
            for dep in &service.depends_on {
                if *failed.get(&dep.target).unwrap_or(&false) && dep.required {
                    blocked = true;
                    break;
                }
            }
            if blocked {
                failed.insert(service_name.clone(), true);
                results.push(StepResult {
                    name: service_name.clone(),
                    success: false,
                    message: "skipped: required dependency failed".to_string(),
                });
                continue;
            }

            let container_name = service.resolved_container_name(&group.name);
            let Some(id) = self.find_container_id(&container_name).await? else {
                failed.insert(service_name.clone(), true);
                results.push(StepResult {
                    name: service_name.clone(),
                    success: false,
                    message: format!("container {container_name} not deployed"),
                });
                continue;
            };

            if let Err(e) = self.client.containers().start(&id).await {
                failed.insert(service_name.clone(), true);
                results.push(StepResult {
                    name: service_name.clone(),
                    success: false,
                    message: e.to_string(),
                });
                continue;
            }

            let mut step_failed = false;
            for dep in &service.depends_on {
                let dep_service = &group.services[&dep.target];
                let dep_container = dep_service.resolved_container_name(&group.name);
                let Some(dep_id) = self.find_container_id(&dep_container).await? else {
                    if dep.required {
                        step_failed = true;
                    }
                    continue;
                };

                let satisfied = match dep.condition {
                    DependencyCondition::Started => self.wait_started(&dep_id).await,
                    DependencyCondition::Healthy => {
                        self.wait_healthy(&dep_id, dep_service).await
                    }
                    DependencyCondition::CompletedSuccessfully => {
                        self.wait_completed_successfully(&dep_id).await
                    }
                };

                if satisfied.is_err() && dep.required {
                    step_failed = true;
                }
            }

            if step_failed {
                failed.insert(service_name.clone(), true);
                results.push(StepResult {
                    name: service_name.clone(),
                    success: false,
                    message: "a required dependency condition was not satisfied".to_string(),
                });
            } else {
                results.push(StepResult {
                    name: service_name.clone(),
                    success: true,
                    message: "started".to_string(),
                });
            }
        }

        Ok(results)
    }

    /// Stop every running service in reverse topological order (§4.5's Stop).
    pub async fn stop(&self, group: &ServiceGroup) -> OrchResult<Vec<StepResult>> {
        let mut order = model::topological_order(&group.services)
            .map_err(|cycle| OrchError::dependency(format!("cycle at {cycle}")))?;
        order.reverse();

        let mut results = Vec::new();
        for service_name in order {
            let service = &group.services[&service_name];
            let container_name = service.resolved_container_name(&group.name);
            let Some(id) = self.find_container_id(&container_name).await? else {
                continue;
            };
            match self.client.containers().stop(&id, Some(service.stop_grace_period)).await {
                Ok(()) => results.push(StepResult {
                    name: service_name,
                    success: true,
                    message: "stopped".to_string(),
                }),
                Err(e) => results.push(StepResult {
                    name: service_name,
                    success: false,
                    message: e.to_string(),
                }),
            }
        }
        Ok(results)
    }

    /// Stop (if running) and remove every service's container, then remove
    /// any group network with no foreign container still attached (§4.5's Remove).
    pub async fn remove(&self, group: &ServiceGroup) -> OrchResult<Vec<StepResult>> {
        let mut results = self.stop(group).await.unwrap_or_default();

        for service in group.services.values() {
            let container_name = service.resolved_container_name(&group.name);
            if let Some(id) = self.find_container_id(&container_name).await? {
                let options = crate::container::RemoveOptions::default();
                match self.client.containers().remove(&id, options).await {
                    Ok(()) => results.push(StepResult {
                        name: service.name.clone(),
                        success: true,
                        message: "removed".to_string(),
                    }),
                    Err(e) => results.push(StepResult {
                        name: service.name.clone(),
                        success: false,
                        message: e.to_string(),
                    }),
                }
            }
        }

        let net_orchestrator = NetworkOrchestrator::new(self.client);
        for network in group.networks.values() {
            let resolved = network.resolved_network_name(&group.name);
            match net_orchestrator.inspect(&resolved).await {
                Ok(info) if info.containers.is_empty() => {
                    match net_orchestrator.delete(&resolved).await {
                        Ok(()) => results.push(StepResult {
                            name: network.name.clone(),
                            success: true,
                            message: "network removed".to_string(),
                        }),
                        Err(e) => results.push(StepResult {
                            name: network.name.clone(),
                            success: false,
                            message: e.to_string(),
                        }),
                    }
                }
                Ok(_) => debug!("leaving network {resolved} in place: other containers attached"),
                Err(_) => {}
            }
        }

        Ok(results)
    }

    /// Query each service's runtime state and aggregate into a [`GroupStatus`] (§4.5).
    pub async fn status(&self, group: &ServiceGroup) -> OrchResult<GroupStatus> {
        if group.services.is_empty() {
            return Ok(GroupStatus::Unknown);
        }

        let mut seen = 0usize;
        let mut running = 0usize;
        let mut failed = 0usize;

        for service in group.services.values() {
            let container_name = service.resolved_container_name(&group.name);
            let Some(id) = self.find_container_id(&container_name).await? else {
                continue;
            };
            seen += 1;
            let info = self.client.containers().inspect(&id).await?;
            match info.status {
                ContainerStatus::Running { .. } => running += 1,
                ContainerStatus::Exited { exit_code, .. } if exit_code != 0 => failed += 1,
                ContainerStatus::Dead => failed += 1,
                _ => {}
            }
        }

        let status = if failed > 0 {
            GroupStatus::Failed
        } else if seen == 0 {
            GroupStatus::Stopped
        } else if running == group.services.len() {
            GroupStatus::Running
        } else if running > 0 {
            GroupStatus::PartiallyRunning
        } else {
            GroupStatus::Created
        };
        Ok(status)
    }

    /// Best-effort import of a Compose-style document into a new group (§4.5).
    /// Only `image`, `command`, `entrypoint`, `environment`, `ports`, `volumes`,
    /// `depends_on`, and the top-level `networks` section are mapped; anything
    /// else is dropped with a warning.
    pub fn import_compose(name: impl Into<String>, document: &serde_json::Value) -> ServiceGroup {
        let mut group = ServiceGroup::new(name);

        if let Some(networks) = document.get("networks").and_then(|v| v.as_object()) {
            for net_name in networks.keys() {
                group.add_network(ServiceNetwork::new(
                    net_name.clone(),
                    crate::network::NetworkDriver::Bridge,
                ));
            }
        }

        let Some(services) = document.get("services").and_then(|v| v.as_object()) else {
            return group;
        };

        for (svc_name, spec) in services {
            let image = spec
                .get("image")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let mut service = Service::new(svc_name.clone(), image);

            if let Some(command) = spec.get("command") {
                service.command = parse_string_list(command);
            }
            if let Some(entrypoint) = spec.get("entrypoint") {
                service.entrypoint = parse_string_list(entrypoint);
            }
            if let Some(env) = spec.get("environment").and_then(|v| v.as_object()) {
                for (k, v) in env {
                    if let Some(s) = v.as_str() {
                        service.environment.insert(k.clone(), s.to_string());
                    }
                }
            }
            if let Some(depends_on) = spec.get("depends_on").and_then(|v| v.as_array()) {
                for dep in depends_on {
                    if let Some(target) = dep.as_str() {
                        service
                            .depends_on
                            .push(ServiceDependency::new(target, DependencyCondition::Started));
                    }
                }
            }
            if let Some(volumes) = spec.get("volumes").and_then(|v| v.as_array()) {
                for vol in volumes {
                    if let Some(spec_str) = vol.as_str() {
                        if let Some((host, container)) = spec_str.split_once(':') {
                            service
                                .volumes
                                .insert(host.to_string(), container.to_string());
                        }
                    }
                }
            }

            for key in spec.as_object().into_iter().flat_map(|o| o.keys()) {
                if !matches!(
                    key.as_str(),
                    "image" | "command" | "entrypoint" | "environment" | "ports" | "volumes"
                        | "depends_on" | "networks"
                ) {
                    warn!("compose import: dropping unmapped field '{key}' on service '{svc_name}'");
                }
            }

            group.add_service(service);
        }

        group
    }

    fn build_container_config(
        &self,
        group: &ServiceGroup,
        service: &Service,
        container_name: &str,
    ) -> ContainerConfig {
        let mut config = ContainerConfig {
            image: service.image.clone(),
            name: Some(container_name.to_string()),
            command: service.command.clone(),
            entrypoint: service.entrypoint.clone(),
            working_dir: service.working_dir.clone(),
            environment: service.environment.clone(),
            ports: service.ports.clone(),
            labels: service.labels.clone(),
            restart_policy: service.restart_policy.clone(),
            health_check: service.health_check.clone(),
            user: service.user.clone(),
            ..ContainerConfig::default()
        };

        for (host, container) in &service.volumes {
            config.volumes.push(VolumeMount::new(
                VolumeSource::HostPath(host.as_str().into()),
                container.as_str(),
            ));
        }

        if let Some(cpu) = service.cpu_limit {
            config.resource_limits.cpu_quota = Some((cpu * 100_000.0) as u64);
            config.resource_limits.cpu_period = Some(100_000);
        }
        config.resource_limits.memory = service.memory_limit;

        for network_name in &service.networks {
            if let Some(network) = group.networks.get(network_name) {
                let resolved = network.resolved_network_name(&group.name);
                config.networks.push(crate::container::NetworkAttachment {
                    network: crate::types::NetworkId::new_unchecked(resolved),
                    aliases: Vec::new(),
                    ip_address: None,
                });
            }
        }

        config
    }

    async fn find_container_id(
        &self,
        name: &str,
    ) -> OrchResult<Option<crate::types::ContainerId>> {
        let containers = self.client.containers().list(true).await?;
        Ok(containers
            .into_iter()
            .find(|c| c.name.as_deref() == Some(name))
            .map(|c| c.id))
    }

    async fn wait_started(&self, id: &crate::types::ContainerId) -> OrchResult<()> {
        let info = self.client.containers().inspect(id).await?;
        if matches!(info.status, ContainerStatus::Running { .. }) {
            Ok(())
        } else {
            Err(OrchError::dependency(format!("{id} is not running")))
        }
    }

    async fn wait_healthy(
        &self,
        id: &crate::types::ContainerId,
        dependency: &Service,
    ) -> OrchResult<()> {
        let Some(health_check) = &dependency.health_check else {
            return self.wait_started(id).await;
        };

        let interval = if health_check.interval.is_zero() {
            DEFAULT_HEALTH_POLL_INTERVAL
        } else {
            health_check.interval
        };
        let retries = if health_check.retries == 0 {
            DEFAULT_HEALTH_RETRIES
        } else {
            health_check.retries
        };
        let timeout = if health_check.timeout.is_zero() {
            DEFAULT_HEALTH_TIMEOUT
        } else {
            health_check.timeout
        };
        let deadline = retries * timeout.as_secs() as u32;

        let start = std::time::Instant::now();
        loop {
            if self.docker_health_status(id).await?.as_deref() == Some("healthy") {
                return Ok(());
            }
            if start.elapsed() >= Duration::from_secs(deadline.into()) {
                return Err(OrchError::timeout(
                    format!("waiting for {id} to become healthy"),
                    start.elapsed(),
                ));
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn wait_completed_successfully(&self, id: &crate::types::ContainerId) -> OrchResult<()> {
        let exit_code = self.client.containers().wait(id).await?;
        if exit_code == 0 {
            Ok(())
        } else {
            Err(OrchError::dependency(format!(
                "{id} exited with code {exit_code}"
            )))
        }
    }

    /// Docker's native `State.Health.Status` (not exposed by `container::health`,
    /// which only probes ad-hoc port/HTTP/command checks).
    async fn docker_health_status(
        &self,
        id: &crate::types::ContainerId,
    ) -> OrchResult<Option<String>> {
        let args = vec![
            "inspect".to_string(),
            "--format".to_string(),
            "{{if .State.Health}}{{.State.Health.Status}}{{end}}".to_string(),
            id.to_string(),
        ];
        let output = self.client.execute_command_stdout(&args).await?;
        let status = output.trim();
        if status.is_empty() {
            Ok(None)
        } else {
            Ok(Some(status.to_string()))
        }
    }
}

fn parse_string_list(value: &serde_json::Value) -> Option<Vec<String>> {
    match value {
        serde_json::Value::String(s) => {
            Some(s.split_whitespace().map(str::to_string).collect())
        }
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_import_maps_core_fields() {
        let doc = serde_json::json!({
            "services": {
                "web": {
                    "image": "nginx:latest",
                    "depends_on": ["db"],
                    "environment": { "FOO": "bar" },
                },
                "db": {
                    "image": "postgres:13",
                }
            },
            "networks": { "default": {} }
        });

        let group = ServiceOrchestrator::import_compose("demo", &doc);
        assert_eq!(group.services.len(), 2);
        assert!(group.networks.contains_key("default"));
        let web = &group.services["web"];
        assert_eq!(web.image, "nginx:latest");
        assert_eq!(web.depends_on[0].target, "db");
        assert_eq!(web.environment.get("FOO"), Some(&"bar".to_string()));
    }

    #[test]
    fn parse_string_list_handles_both_forms() {
        assert_eq!(
            parse_string_list(&serde_json::json!("run me")),
            Some(vec!["run".to_string(), "me".to_string()])
        );
        assert_eq!(
            parse_string_list(&serde_json::json!(["run", "me"])),
            Some(vec!["run".to_string(), "me".to_string()])
        );
    }
}
