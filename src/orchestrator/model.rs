//! Data model for service groups: services, their dependencies, and the
//! networks they share (§3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::templates::{TemplateKind, TemplateRecord};
use crate::types::{HealthCheck, PortMapping, RestartPolicy};

/// The condition under which a dependent service proceeds past a dependency (§3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyCondition {
    /// The dependency's container is running.
    Started,
    /// The dependency's container reports a healthy status.
    Healthy,
    /// The dependency's container has exited with code 0.
    CompletedSuccessfully,
}

/// One edge of a service's dependency list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDependency {
    /// Name of the service depended on; must exist in the same group.
    pub target: String,
    /// Condition that must hold before the dependent proceeds.
    pub condition: DependencyCondition,
    /// Whether a failure to satisfy the condition blocks the dependent.
    pub required: bool,
}

impl ServiceDependency {
    /// Construct a required dependency on `target` with `condition`.
    #[must_use]
    pub fn new(target: impl Into<String>, condition: DependencyCondition) -> Self {
        Self {
            target: target.into(),
            condition,
            required: true,
        }
    }

    /// Mark the dependency optional: its failure does not block the dependent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A single container within a [`ServiceGroup`] (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Service name, unique within the owning group.
    pub name: String,
    /// Image reference to run.
    pub image: String,
    /// Explicit container name; defaults to `<group>-<service>` if unset.
    pub container_name: Option<String>,
    /// Command override.
    pub command: Option<Vec<String>>,
    /// Entrypoint override.
    pub entrypoint: Option<Vec<String>>,
    /// Working directory inside the container.
    pub working_dir: Option<PathBuf>,
    /// User to run as.
    pub user: Option<String>,
    /// Restart policy.
    pub restart_policy: RestartPolicy,
    /// Container-port+protocol -> host-port mappings.
    pub ports: Vec<PortMapping>,
    /// Host-path -> container-path volume mounts.
    pub volumes: HashMap<String, String>,
    /// Environment variables.
    pub environment: HashMap<String, String>,
    /// Names of [`ServiceNetwork`]s this service attaches to; each must exist in the group.
    pub networks: Vec<String>,
    /// Labels applied to the container.
    pub labels: HashMap<String, String>,
    /// Optional health check.
    pub health_check: Option<HealthCheck>,
    /// CPU limit, in fractional cores.
    pub cpu_limit: Option<f64>,
    /// Memory limit, in bytes.
    pub memory_limit: Option<u64>,
    /// Grace period given to `docker stop`.
    pub stop_grace_period: Duration,
    /// Dependencies that must be satisfied before this service starts.
    pub depends_on: Vec<ServiceDependency>,
}

impl Service {
    /// Construct a service with otherwise-default fields.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            container_name: None,
            command: None,
            entrypoint: None,
            working_dir: None,
            user: None,
            restart_policy: RestartPolicy::No,
            ports: Vec::new(),
            volumes: HashMap::new(),
            environment: HashMap::new(),
            networks: Vec::new(),
            labels: HashMap::new(),
            health_check: None,
            cpu_limit: None,
            memory_limit: None,
            stop_grace_period: Duration::from_secs(10),
            depends_on: Vec::new(),
        }
    }

    /// The Docker container name this service resolves to within `group_name`.
    #[must_use]
    pub fn resolved_container_name(&self, group_name: &str) -> String {
        self.container_name
            .clone()
            .unwrap_or_else(|| format!("{group_name}-{}", self.name))
    }
}

/// A network shared by services within a [`ServiceGroup`] (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceNetwork {
    /// Network name, unique within the owning group.
    pub name: String,
    /// Network driver.
    pub driver: crate::network::NetworkDriver,
    /// Optional CIDR subnet.
    pub subnet: Option<String>,
    /// Optional gateway address.
    pub gateway: Option<String>,
    /// Whether the network is internal.
    pub internal: bool,
    /// Whether IPv6 is enabled.
    pub ipv6: bool,
    /// Labels applied to the network.
    pub labels: HashMap<String, String>,
}

impl ServiceNetwork {
    /// Construct a network with otherwise-default fields.
    #[must_use]
    pub fn new(name: impl Into<String>, driver: crate::network::NetworkDriver) -> Self {
        Self {
            name: name.into(),
            driver,
            subnet: None,
            gateway: None,
            internal: false,
            ipv6: false,
            labels: HashMap::new(),
        }
    }

    /// The Docker network name this resolves to within `group_name`.
    #[must_use]
    pub fn resolved_network_name(&self, group_name: &str) -> String {
        format!("{group_name}-{}", self.name)
    }
}

/// Aggregated runtime status of a [`ServiceGroup`] (§4.5's Aggregate status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupStatus {
    /// No status has been determined yet.
    Unknown,
    /// Containers exist but none are running.
    Created,
    /// Every service's container is running.
    Running,
    /// Some but not all service containers are running.
    PartiallyRunning,
    /// No service container exists.
    Stopped,
    /// At least one service container has crashed.
    Failed,
}

/// A named collection of services and the networks they share (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceGroup {
    /// Group name, globally unique.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Group schema version.
    pub version: String,
    /// Services by name.
    pub services: HashMap<String, Service>,
    /// Networks by name.
    pub networks: HashMap<String, ServiceNetwork>,
    /// Unix-epoch milliseconds at creation.
    pub created_at: i64,
    /// Unix-epoch milliseconds at last save.
    pub updated_at: i64,
    /// Last-known aggregated status.
    pub status: GroupStatus,
}

impl ServiceGroup {
    /// Construct an empty group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            name: name.into(),
            description: String::new(),
            version: "1".to_string(),
            services: HashMap::new(),
            networks: HashMap::new(),
            created_at: now,
            updated_at: now,
            status: GroupStatus::Unknown,
        }
    }

    /// Add or replace a service, keyed by its own `name` field.
    pub fn add_service(&mut self, service: Service) {
        self.services.insert(service.name.clone(), service);
    }

    /// Add or replace a network, keyed by its own `name` field.
    pub fn add_network(&mut self, network: ServiceNetwork) {
        self.networks.insert(network.name.clone(), network);
    }

    /// Validate the invariants of §3. Returns every violation found; an empty
    /// vector means the group is well-formed. Nothing is mutated either way.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for service in self.services.values() {
            for dep in &service.depends_on {
                if !self.services.contains_key(&dep.target) {
                    errors.push(format!(
                        "service '{}' depends on unknown service '{}'",
                        service.name, dep.target
                    ));
                }
            }
            for network in &service.networks {
                if !self.networks.contains_key(network) {
                    errors.push(format!(
                        "service '{}' references unknown network '{network}'",
                        service.name
                    ));
                }
            }
        }

        if let Err(cycle) = topological_order(&self.services) {
            errors.push(format!("dependency graph has a cycle: {cycle}"));
        }

        errors
    }
}

impl TemplateRecord for ServiceGroup {
    fn kind() -> TemplateKind {
        TemplateKind::ServiceGroup
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Depth-first topological sort with temporary-mark cycle detection (§4.5).
/// Services with no unresolved predecessor come first; a service's own
/// iteration order is stabilized by sorting names before traversal.
pub fn topological_order(services: &HashMap<String, Service>) -> Result<Vec<String>, String> {
    #[derive(PartialEq, Eq)]
    enum Mark {
        Temporary,
        Permanent,
    }

    let mut names: Vec<&String> = services.keys().collect();
    names.sort();

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut order = Vec::with_capacity(services.len());

    fn visit<'a>(
        name: &'a str,
        services: &'a HashMap<String, Service>,
        marks: &mut HashMap<&'a str, Mark>,
        order: &mut Vec<String>,
    ) -> Result<(), String> {
        match marks.get(name) {
            Some(Mark::Permanent) => return Ok(()),
            Some(Mark::Temporary) => return Err(name.to_string()),
            None => {}
        }
        marks.insert(name, Mark::Temporary);

        if let Some(service) = services.get(name) {
            let mut deps: Vec<&String> = service.depends_on.iter().map(|d| &d.target).collect();
            deps.sort();
            for dep in deps {
                if services.contains_key(dep) {
                    visit(dep, services, marks, order)?;
                }
            }
        }

        marks.insert(name, Mark::Permanent);
        order.push(name.to_string());
        Ok(())
    }

    for name in names {
        visit(name, services, &mut marks, &mut order)?;
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkDriver;

    fn group_with_chain() -> ServiceGroup {
        let mut group = ServiceGroup::new("demo");
        group.add_service(Service::new("db", "postgres:13"));
        let mut api = Service::new("api", "app:latest");
        api.depends_on.push(ServiceDependency::new("db", DependencyCondition::Healthy));
        group.add_service(api);
        let mut web = Service::new("web", "nginx:latest");
        web.depends_on.push(ServiceDependency::new("api", DependencyCondition::Started));
        group.add_service(web);
        group
    }

    #[test]
    fn validate_accepts_well_formed_group() {
        assert!(group_with_chain().validate().is_empty());
    }

    #[test]
    fn validate_flags_unknown_dependency() {
        let mut group = ServiceGroup::new("demo");
        let mut svc = Service::new("api", "app:latest");
        svc.depends_on.push(ServiceDependency::new("missing", DependencyCondition::Started));
        group.add_service(svc);
        let errors = group.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("missing"));
    }

    #[test]
    fn validate_flags_unknown_network() {
        let mut group = ServiceGroup::new("demo");
        let mut svc = Service::new("api", "app:latest");
        svc.networks.push("absent".to_string());
        group.add_service(svc);
        let errors = group.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("absent"));
    }

    #[test]
    fn validate_flags_cycle() {
        let mut group = ServiceGroup::new("demo");
        let mut a = Service::new("a", "img");
        a.depends_on.push(ServiceDependency::new("b", DependencyCondition::Started));
        let mut b = Service::new("b", "img");
        b.depends_on.push(ServiceDependency::new("a", DependencyCondition::Started));
        group.add_service(a);
        group.add_service(b);
        let errors = group.validate();
        assert!(errors.iter().any(|e| e.contains("cycle")));
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let group = group_with_chain();
        let order = topological_order(&group.services).unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("db") < pos("api"));
        assert!(pos("api") < pos("web"));
    }

    #[test]
    fn topological_order_is_deterministic() {
        let group = group_with_chain();
        let a = topological_order(&group.services).unwrap();
        let b = topological_order(&group.services).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn network_resolves_with_group_prefix() {
        let net = ServiceNetwork::new("backend", NetworkDriver::Bridge);
        assert_eq!(net.resolved_network_name("demo"), "demo-backend");
    }

    #[test]
    fn service_resolves_default_container_name() {
        let svc = Service::new("api", "app:latest");
        assert_eq!(svc.resolved_container_name("demo"), "demo-api");
    }
}
