//! Development-environment templates, materialized into running containers
//! and editor metadata by [`crate::devenv`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::types::{PortMapping, RestartPolicy};

use super::TemplateRecord;

/// The kind of development environment a template provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    /// Python interpreter-based environment.
    Python,
    /// Node.js environment.
    Nodejs,
    /// Combined frontend/backend environment.
    Fullstack,
    /// Database-only environment.
    Database,
    /// Anything not covered by the above.
    Custom,
}

/// A volume mount declared by a dev-environment template.
///
/// `host_path` is a template-level string (not yet resolved to a filesystem
/// path) because it may contain the `${workspaceFolder}` token, expanded by
/// [`crate::devenv`] against the caller-supplied project directory (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevEnvVolumeMount {
    /// Host-side path, possibly containing `${workspaceFolder}`.
    pub host_path: String,
    /// Mount point inside the container.
    pub container_path: PathBuf,
    /// Whether the mount is read-only.
    pub read_only: bool,
}

impl DevEnvVolumeMount {
    /// Construct a read-write mount.
    #[must_use]
    pub fn new(host_path: impl Into<String>, container_path: impl Into<PathBuf>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            read_only: false,
        }
    }

    /// Mark the mount read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// A named development-environment blueprint (§3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevEnvironmentTemplate {
    /// Template name, unique within the dev-environment directory.
    pub name: String,
    /// Environment-type tag.
    pub env_type: EnvironmentType,
    /// Image reference to run.
    pub image: String,
    /// Human-readable description.
    pub description: String,
    /// Optional command override.
    pub command: Option<Vec<String>>,
    /// Optional entrypoint override.
    pub entrypoint: Option<Vec<String>>,
    /// Working directory inside the container.
    pub working_dir: PathBuf,
    /// Port mappings to forward.
    pub ports: Vec<PortMapping>,
    /// Volume mounts, possibly containing `${workspaceFolder}`.
    pub volumes: Vec<DevEnvVolumeMount>,
    /// Environment variables.
    pub environment: HashMap<String, String>,
    /// CPU limit, in fractional cores.
    pub cpu_limit: Option<f64>,
    /// Memory limit, in bytes.
    pub memory_limit: Option<u64>,
    /// Docker network mode (e.g. "bridge", "host").
    pub network_mode: String,
    /// Container restart policy.
    pub restart_policy: RestartPolicy,
    /// Editor extensions recommended for this environment.
    pub vscode_extensions: Vec<String>,
    /// `devcontainer.json` `features` map, passed through verbatim.
    pub devcontainer_features: HashMap<String, serde_json::Value>,
}

impl DevEnvironmentTemplate {
    /// The four built-in dev-environment templates materialized on first run (§4.2).
    #[must_use]
    pub fn builtins() -> Vec<Self> {
        vec![
            Self {
                name: "python".to_string(),
                env_type: EnvironmentType::Python,
                image: "python:3.9-slim".to_string(),
                description: "Python development environment".to_string(),
                command: None,
                entrypoint: None,
                working_dir: PathBuf::from("/app"),
                ports: vec![PortMapping::new(8000)],
                volumes: vec![DevEnvVolumeMount::new("${workspaceFolder}", "/app")],
                environment: HashMap::from([("PYTHONUNBUFFERED".to_string(), "1".to_string())]),
                cpu_limit: None,
                memory_limit: None,
                network_mode: "bridge".to_string(),
                restart_policy: RestartPolicy::No,
                vscode_extensions: vec!["ms-python.python".to_string()],
                devcontainer_features: HashMap::new(),
            },
            Self {
                name: "nodejs".to_string(),
                env_type: EnvironmentType::Nodejs,
                image: "node:20-slim".to_string(),
                description: "Node.js development environment".to_string(),
                command: None,
                entrypoint: None,
                working_dir: PathBuf::from("/app"),
                ports: vec![PortMapping::new(3000)],
                volumes: vec![DevEnvVolumeMount::new("${workspaceFolder}", "/app")],
                environment: HashMap::new(),
                cpu_limit: None,
                memory_limit: None,
                network_mode: "bridge".to_string(),
                restart_policy: RestartPolicy::No,
                vscode_extensions: vec!["dbaeumer.vscode-eslint".to_string()],
                devcontainer_features: HashMap::new(),
            },
            Self {
                name: "fullstack".to_string(),
                env_type: EnvironmentType::Fullstack,
                image: "node:20-slim".to_string(),
                description: "Combined Node.js frontend / Python backend environment".to_string(),
                command: None,
                entrypoint: None,
                working_dir: PathBuf::from("/app"),
                ports: vec![PortMapping::new(3000), PortMapping::new(8000)],
                volumes: vec![DevEnvVolumeMount::new("${workspaceFolder}", "/app")],
                environment: HashMap::new(),
                cpu_limit: None,
                memory_limit: None,
                network_mode: "bridge".to_string(),
                restart_policy: RestartPolicy::No,
                vscode_extensions: vec![
                    "dbaeumer.vscode-eslint".to_string(),
                    "ms-python.python".to_string(),
                ],
                devcontainer_features: HashMap::new(),
            },
            Self {
                name: "postgres".to_string(),
                env_type: EnvironmentType::Database,
                image: "postgres:13".to_string(),
                description: "PostgreSQL development database".to_string(),
                command: None,
                entrypoint: None,
                working_dir: PathBuf::from("/"),
                ports: vec![PortMapping::new(5432)],
                volumes: vec![DevEnvVolumeMount::new(
                    "${workspaceFolder}/.pgdata",
                    "/var/lib/postgresql/data",
                )],
                environment: HashMap::from([(
                    "POSTGRES_PASSWORD".to_string(),
                    "postgres".to_string(),
                )]),
                cpu_limit: None,
                memory_limit: None,
                network_mode: "bridge".to_string(),
                restart_policy: RestartPolicy::No,
                vscode_extensions: vec![],
                devcontainer_features: HashMap::new(),
            },
        ]
    }
}

impl TemplateRecord for DevEnvironmentTemplate {
    fn kind() -> super::TemplateKind {
        super::TemplateKind::DevEnvironment
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
        let builtins = DevEnvironmentTemplate::builtins();
        let mut names: Vec<&str> = builtins.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), builtins.len());
    }

    #[test]
    fn python_template_matches_scenario_s5() {
        let python = DevEnvironmentTemplate::builtins()
            .into_iter()
            .find(|t| t.name == "python")
            .unwrap();
        assert_eq!(python.image, "python:3.9-slim");
        assert_eq!(python.working_dir, PathBuf::from("/app"));
        assert_eq!(python.ports[0].container_port, 8000);
    }
}
