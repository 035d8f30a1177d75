//! Network templates: named blueprints for [`crate::net_manager`] to expand.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::network::NetworkDriver;

use super::TemplateRecord;

/// A named network blueprint, referenced by name when provisioning (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkTemplate {
    /// Template name, unique within the network-template directory.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Network driver.
    pub driver: NetworkDriver,
    /// Optional CIDR subnet.
    pub subnet: Option<String>,
    /// Optional gateway address.
    pub gateway: Option<String>,
    /// Whether the network is internal (no external connectivity).
    pub internal: bool,
    /// Whether IPv6 is enabled.
    pub enable_ipv6: bool,
    /// Driver-specific options.
    pub options: HashMap<String, String>,
    /// Labels applied to every network created from this template.
    pub labels: HashMap<String, String>,
}

impl NetworkTemplate {
    /// Construct a new template with otherwise-default fields.
    #[must_use]
    pub fn new(name: impl Into<String>, driver: NetworkDriver) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            driver,
            subnet: None,
            gateway: None,
            internal: false,
            enable_ipv6: false,
            options: HashMap::new(),
            labels: HashMap::new(),
        }
    }

    /// The five built-in network templates materialized on first run (§4.2).
    #[must_use]
    pub fn builtins() -> Vec<Self> {
        vec![
            Self {
                name: "isolated".to_string(),
                description: "Internal-only network with no external connectivity".to_string(),
                driver: NetworkDriver::Bridge,
                subnet: None,
                gateway: None,
                internal: true,
                enable_ipv6: false,
                options: HashMap::new(),
                labels: HashMap::new(),
            },
            Self {
                name: "web_app".to_string(),
                description: "Bridge network for web-facing application stacks".to_string(),
                driver: NetworkDriver::Bridge,
                subnet: Some("172.28.0.0/16".to_string()),
                gateway: Some("172.28.0.1".to_string()),
                internal: false,
                enable_ipv6: false,
                options: HashMap::new(),
                labels: HashMap::new(),
            },
            Self {
                name: "high_performance".to_string(),
                description: "Bridge network tuned for low-latency service meshes".to_string(),
                driver: NetworkDriver::Bridge,
                subnet: Some("172.29.0.0/16".to_string()),
                gateway: Some("172.29.0.1".to_string()),
                internal: false,
                enable_ipv6: false,
                options: HashMap::from([("com.docker.network.driver.mtu".to_string(), "9000".to_string())]),
                labels: HashMap::new(),
            },
            Self {
                name: "database".to_string(),
                description: "Internal network for database and cache services".to_string(),
                driver: NetworkDriver::Bridge,
                subnet: Some("172.30.0.0/16".to_string()),
                gateway: Some("172.30.0.1".to_string()),
                internal: true,
                enable_ipv6: false,
                options: HashMap::new(),
                labels: HashMap::new(),
            },
            Self {
                name: "micro_services".to_string(),
                description: "Shared network for microservice-to-microservice traffic".to_string(),
                driver: NetworkDriver::Bridge,
                subnet: Some("172.31.0.0/16".to_string()),
                gateway: Some("172.31.0.1".to_string()),
                internal: false,
                enable_ipv6: false,
                options: HashMap::new(),
                labels: HashMap::new(),
            },
        ]
    }
}

impl TemplateRecord for NetworkTemplate {
    fn kind() -> super::TemplateKind {
        super::TemplateKind::Network
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_have_unique_names() {
        let builtins = NetworkTemplate::builtins();
        let mut names: Vec<&str> = builtins.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), builtins.len());
    }
}
