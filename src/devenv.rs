//! Dev-Environment Manager (C6): resolves a [`DevEnvironmentTemplate`] against
//! a project directory, optionally emits editor metadata, and optionally
//! creates and starts the environment's container (§4.6).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::client::DockerClient;
use crate::container::ContainerConfig;
use crate::image::{ImageRef, PullOptions};
use crate::orch_error::{OrchError, OrchResult};
use crate::templates::{DevEnvironmentTemplate, TemplateStore};
use crate::types::{VolumeMount, VolumeSource};

const WORKSPACE_TOKEN: &str = "${workspaceFolder}";
const EDITOR_WORKSPACE_TOKEN: &str = "${localWorkspaceFolder}";

/// Options controlling a single environment provisioning call.
#[derive(Debug, Clone, Default)]
pub struct ProvisionOptions {
    /// Extra/overriding environment variables; wins over the template's on conflict.
    pub environment: HashMap<String, String>,
    /// Emit a `.devcontainer/devcontainer.json` manifest. Defaults to `true`.
    pub create_editor_metadata: Option<bool>,
    /// Create and start the container. Defaults to `true`.
    pub start_container: Option<bool>,
    /// Pull the image before creating the container. Defaults to `true`.
    pub pull_image: Option<bool>,
}

impl ProvisionOptions {
    fn create_editor_metadata(&self) -> bool {
        self.create_editor_metadata.unwrap_or(true)
    }

    fn start_container(&self) -> bool {
        self.start_container.unwrap_or(true)
    }

    fn pull_image(&self) -> bool {
        self.pull_image.unwrap_or(true)
    }
}

/// Outcome of [`DevEnvironmentManager::provision`].
#[derive(Debug, Clone)]
pub struct ProvisionResult {
    /// Whether provisioning completed without error.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Container id, if one was created.
    pub container_id: Option<crate::types::ContainerId>,
}

/// The Dev-Environment Manager component (C6).
pub struct DevEnvironmentManager<'a> {
    client: &'a DockerClient,
    store: &'a TemplateStore,
}

impl<'a> DevEnvironmentManager<'a> {
    /// Construct a dev-environment manager over `client`, resolving templates from `store`.
    #[must_use]
    pub fn new(client: &'a DockerClient, store: &'a TemplateStore) -> Self {
        Self { client, store }
    }

    /// Provision a dev environment from `template_name` into `project_dir` (§4.6).
    pub async fn provision(
        &self,
        template_name: &str,
        container_name: &str,
        project_dir: &Path,
        options: ProvisionOptions,
    ) -> OrchResult<ProvisionResult> {
        let template: DevEnvironmentTemplate = self.store.get(template_name).await?;

        if options.create_editor_metadata() {
            self.write_editor_metadata(&template, project_dir).await?;
        }

        if !options.start_container() {
            return Ok(ProvisionResult {
                success: true,
                message: format!("resolved template '{template_name}', container not started"),
                container_id: None,
            });
        }

        if options.pull_image() {
            let image_ref = ImageRef::parse(&template.image)?;
            self.client
                .images()
                .pull(&image_ref, PullOptions::default())
                .await?;
        }

        let mut environment = template.environment.clone();
        environment.extend(options.environment);

        let mut volumes = Vec::new();
        for mount in &template.volumes {
            let host_path = resolve_workspace_token(&mount.host_path, project_dir);
            tokio::fs::create_dir_all(&host_path)
                .await
                .map_err(|e| OrchError::internal(format!("creating {}: {e}", host_path.display())))?;
            let mut volume =
                VolumeMount::new(VolumeSource::HostPath(host_path), mount.container_path.clone());
            if mount.read_only {
                volume = volume.read_only();
            }
            volumes.push(volume);
        }

        let config = ContainerConfig {
            image: template.image.clone(),
            name: Some(container_name.to_string()),
            command: template.command.clone(),
            entrypoint: template.entrypoint.clone(),
            working_dir: Some(template.working_dir.clone()),
            environment,
            ports: template.ports.clone(),
            volumes,
            restart_policy: template.restart_policy.clone(),
            resource_limits: crate::types::ResourceLimits {
                memory: template.memory_limit,
                cpu_quota: template.cpu_limit.map(|c| (c * 100_000.0) as u64),
                cpu_period: template.cpu_limit.map(|_| 100_000),
                ..Default::default()
            },
            ..ContainerConfig::default()
        };

        let id = self.client.containers().create_and_start(config).await?;

        Ok(ProvisionResult {
            success: true,
            message: format!("started {container_name} from template '{template_name}'"),
            container_id: Some(id),
        })
    }

    /// Create a new template.
    pub async fn create_template(&self, template: &DevEnvironmentTemplate) -> OrchResult<()> {
        self.store.save(template).await
    }

    /// Apply `patch` to an existing template and save it.
    pub async fn update_template(
        &self,
        name: &str,
        patch: impl FnOnce(&mut DevEnvironmentTemplate),
    ) -> OrchResult<()> {
        let mut template = self.store.get::<DevEnvironmentTemplate>(name).await?;
        patch(&mut template);
        self.store.save(&template).await
    }

    /// Delete a template by name.
    pub async fn delete_template(&self, name: &str) -> OrchResult<()> {
        self.store.delete::<DevEnvironmentTemplate>(name).await
    }

    /// List every dev-environment template.
    pub async fn list_templates(&self) -> OrchResult<Vec<DevEnvironmentTemplate>> {
        self.store.list().await
    }

    /// Get a single template by name.
    pub async fn get_template(&self, name: &str) -> OrchResult<DevEnvironmentTemplate> {
        self.store.get(name).await
    }

    /// Write a template to a standalone JSON file for sharing or backup.
    pub async fn export_template(&self, name: &str, path: &Path) -> OrchResult<()> {
        let template: DevEnvironmentTemplate = self.store.get(name).await?;
        let body = serde_json::to_vec_pretty(&template)
            .map_err(|e| OrchError::internal(format!("serializing template: {e}")))?;
        tokio::fs::write(path, body)
            .await
            .map_err(|e| OrchError::internal(format!("writing {}: {e}", path.display())))
    }

    /// Read a standalone template JSON file and add it to the store.
    pub async fn import_template(&self, path: &Path) -> OrchResult<DevEnvironmentTemplate> {
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| OrchError::internal(format!("reading {}: {e}", path.display())))?;
        let template: DevEnvironmentTemplate = serde_json::from_slice(&body)
            .map_err(|e| OrchError::validation(format!("{}: {e}", path.display())))?;
        self.store.save(&template).await?;
        Ok(template)
    }

    async fn write_editor_metadata(
        &self,
        template: &DevEnvironmentTemplate,
        project_dir: &Path,
    ) -> OrchResult<()> {
        let dir = project_dir.join(".devcontainer");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| OrchError::internal(format!("creating {}: {e}", dir.display())))?;

        let mounts: Vec<String> = template
            .volumes
            .iter()
            .map(|m| {
                let host = m.host_path.replace(WORKSPACE_TOKEN, EDITOR_WORKSPACE_TOKEN);
                format!(
                    "source={host},target={},type=bind{}",
                    m.container_path.display(),
                    if m.read_only { ",readonly" } else { "" }
                )
            })
            .collect();

        let forward_ports: Vec<u16> = template.ports.iter().map(|p| p.container_port).collect();

        let workspace_mount = format!(
            "source={EDITOR_WORKSPACE_TOKEN},target={},type=bind",
            template.working_dir.display()
        );

        let mut run_args = Vec::new();
        if let Some(cpu) = template.cpu_limit {
            run_args.push("--cpus".to_string());
            run_args.push(cpu.to_string());
        }
        if let Some(memory) = template.memory_limit {
            run_args.push("--memory".to_string());
            run_args.push(memory.to_string());
        }

        let manifest = serde_json::json!({
            "name": template.name,
            "image": template.image,
            "workspaceFolder": template.working_dir,
            "workspaceMount": workspace_mount,
            "mounts": mounts,
            "forwardPorts": forward_ports,
            "remoteEnv": template.environment,
            "extensions": template.vscode_extensions,
            "features": template.devcontainer_features,
            "runArgs": run_args,
        });

        let body = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| OrchError::internal(format!("serializing devcontainer.json: {e}")))?;
        let path = dir.join("devcontainer.json");
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| OrchError::internal(format!("writing {}: {e}", path.display())))
    }
}

fn resolve_workspace_token(template_path: &str, project_dir: &Path) -> PathBuf {
    let resolved = template_path.replace(WORKSPACE_TOKEN, &project_dir.to_string_lossy());
    PathBuf::from(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_workspace_token_at_start() {
        let resolved = resolve_workspace_token("${workspaceFolder}", Path::new("/home/me/proj"));
        assert_eq!(resolved, PathBuf::from("/home/me/proj"));
    }

    #[test]
    fn resolves_workspace_token_with_suffix() {
        let resolved =
            resolve_workspace_token("${workspaceFolder}/.pgdata", Path::new("/home/me/proj"));
        assert_eq!(resolved, PathBuf::from("/home/me/proj/.pgdata"));
    }

    #[test]
    fn provision_options_default_to_enabled() {
        let options = ProvisionOptions::default();
        assert!(options.create_editor_metadata());
        assert!(options.start_container());
        assert!(options.pull_image());
    }
}
