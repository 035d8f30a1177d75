//! Typed configuration surface for the orchestration core.
//!
//! The core never reads environment variables or configuration files on its
//! own behalf; an embedding application builds an [`OrchestratorConfig`] and
//! hands it to the component constructors that need it.

use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for every component in the orchestration core.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Root directory for the template store (C2): `networks/`, `dev-environments/`,
    /// `service-groups/`, `channels/` live underneath it.
    pub template_root: PathBuf,
    /// Directory holding one file per [`ServiceGroup`](crate::orchestrator::ServiceGroup).
    pub service_groups_dir: PathBuf,
    /// Directory holding one file per [`CommunicationChannel`](crate::comm::CommunicationChannel).
    pub comm_dir: PathBuf,
    /// Directory used by the dependency-source pool for on-disk customizations and cache metadata.
    pub sources_dir: PathBuf,
    /// Default container-engine facade configuration (C1).
    pub docker: crate::client::ClientConfig,
    /// Interval between Communication Fabric background cycles.
    pub heartbeat_interval: Duration,
    /// Join deadline for the Communication Fabric background task on shutdown.
    pub heartbeat_join_deadline: Duration,
    /// Default health-check poll interval used by C5's `healthy` start condition
    /// when a service's own healthcheck does not specify one.
    pub default_health_poll_interval: Duration,
    /// Default reachability-probe timeout (C3).
    pub reachability_timeout: Duration,
}

impl OrchestratorConfig {
    /// Build a configuration rooted at `root`, laying out the conventional
    /// subdirectory structure underneath it.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            template_root: root.join("templates"),
            service_groups_dir: root.join("service-groups"),
            comm_dir: root.join("channels"),
            sources_dir: root.join("sources"),
            docker: crate::client::ClientConfig::default(),
            heartbeat_interval: Duration::from_secs(5),
            heartbeat_join_deadline: Duration::from_secs(2),
            default_health_poll_interval: Duration::from_secs(2),
            reachability_timeout: Duration::from_secs(2),
        }
    }

    /// Override the container-engine facade configuration.
    #[must_use]
    pub fn docker_config(mut self, docker: crate::client::ClientConfig) -> Self {
        self.docker = docker;
        self
    }

    /// Override the background heartbeat interval.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_consistently() {
        let cfg = OrchestratorConfig::new("/var/lib/smoothstack");
        assert_eq!(
            cfg.template_root,
            PathBuf::from("/var/lib/smoothstack/templates")
        );
        assert_eq!(
            cfg.service_groups_dir,
            PathBuf::from("/var/lib/smoothstack/service-groups")
        );
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(5));
    }
}
