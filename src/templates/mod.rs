//! Template Store (C2): an on-disk catalog of network and dev-environment
//! templates. One structured JSON file per template, one directory per kind,
//! all rooted under [`crate::config::OrchestratorConfig::template_root`].
//!
//! Invalid files are logged and skipped (§4.2) rather than aborting a
//! directory scan; a template directory that does not yet exist is
//! materialized with the built-in defaults on first access.

mod dev_env_template;
mod network_template;

pub use dev_env_template::{DevEnvVolumeMount, DevEnvironmentTemplate, EnvironmentType};
pub use network_template::NetworkTemplate;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::orch_error::{OrchError, OrchResult};

/// The kinds of templates the store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// [`NetworkTemplate`] records.
    Network,
    /// [`DevEnvironmentTemplate`] records.
    DevEnvironment,
    /// [`crate::orchestrator::ServiceGroup`] records.
    ServiceGroup,
    /// [`crate::comm::CommunicationChannel`] records.
    Channel,
}

impl TemplateKind {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::DevEnvironment => "dev-env",
            Self::ServiceGroup => "service-group",
            Self::Channel => "channel",
        }
    }

    /// A human-readable label used in [`OrchError::NotFound`] messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "network template",
            Self::DevEnvironment => "dev-environment template",
            Self::ServiceGroup => "service group",
            Self::Channel => "communication channel",
        }
    }
}

/// A record the template store can persist: it knows its own kind and name.
pub trait TemplateRecord: serde::Serialize + serde::de::DeserializeOwned + Send + Sync {
    /// The kind directory this record type lives under.
    fn kind() -> TemplateKind;
    /// The record's unique name within its kind.
    fn name(&self) -> &str;
}

/// On-disk, per-kind template catalog with built-in defaults.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
    locks: Arc<HashMap<&'static str, RwLock<()>>>,
}

impl TemplateStore {
    /// Open (or lazily create) a template store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut locks = HashMap::new();
        locks.insert(TemplateKind::Network.dir_name(), RwLock::new(()));
        locks.insert(TemplateKind::DevEnvironment.dir_name(), RwLock::new(()));
        locks.insert(TemplateKind::ServiceGroup.dir_name(), RwLock::new(()));
        locks.insert(TemplateKind::Channel.dir_name(), RwLock::new(()));
        Self {
            root: root.into(),
            locks: Arc::new(locks),
        }
    }

    fn kind_dir(&self, kind: TemplateKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    fn record_path(&self, kind: TemplateKind, name: &str) -> PathBuf {
        self.kind_dir(kind).join(format!("{name}.json"))
    }

    fn lock_for(&self, kind: TemplateKind) -> &RwLock<()> {
        self.locks
            .get(kind.dir_name())
            .expect("every TemplateKind has a registered lock")
    }

    /// Ensure the built-in defaults exist for both kinds, materializing them
    /// only if the corresponding directory is absent (§4.2, §4.6).
    pub async fn ensure_defaults(&self) -> OrchResult<()> {
        if !self.kind_dir(TemplateKind::Network).exists() {
            debug!("materializing built-in network templates");
            for template in NetworkTemplate::builtins() {
                self.save(&template).await?;
            }
        }
        if !self.kind_dir(TemplateKind::DevEnvironment).exists() {
            debug!("materializing built-in dev-environment templates");
            for template in DevEnvironmentTemplate::builtins() {
                self.save(&template).await?;
            }
        }
        Ok(())
    }

    /// Persist `record`, creating its kind directory if necessary.
    pub async fn save<T: TemplateRecord>(&self, record: &T) -> OrchResult<()> {
        let kind = T::kind();
        let _guard = self.lock_for(kind).write().await;
        let dir = self.kind_dir(kind);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| OrchError::internal(format!("creating {}: {e}", dir.display())))?;
        let path = self.record_path(kind, record.name());
        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| OrchError::internal(format!("serializing template: {e}")))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| OrchError::internal(format!("writing {}: {e}", path.display())))?;
        Ok(())
    }

    /// Load a single template by name.
    pub async fn get<T: TemplateRecord>(&self, name: &str) -> OrchResult<T> {
        let kind = T::kind();
        let _guard = self.lock_for(kind).read().await;
        let path = self.record_path(kind, name);
        let body = tokio::fs::read(&path)
            .await
            .map_err(|_| OrchError::not_found(kind.label(), name))?;
        serde_json::from_slice(&body)
            .map_err(|e| OrchError::validation(format!("{}: {e}", path.display())))
    }

    /// List every valid template of kind `T`; malformed files are logged and skipped.
    pub async fn list<T: TemplateRecord>(&self) -> OrchResult<Vec<T>> {
        self.load_all().await
    }

    /// Identical to [`TemplateStore::list`]; named to match §4.2's operation list.
    pub async fn load_all<T: TemplateRecord>(&self) -> OrchResult<Vec<T>> {
        let kind = T::kind();
        let _guard = self.lock_for(kind).read().await;
        let dir = self.kind_dir(kind);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => return Ok(Vec::new()),
        };

        let mut records = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|e| OrchError::internal(format!("reading {}: {e}", dir.display())))?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match load_record::<T>(&path).await {
                Ok(record) => records.push(record),
                Err(e) => warn!("skipping invalid template {}: {e}", path.display()),
            }
        }
        records.sort_by(|a: &T, b: &T| a.name().cmp(b.name()));
        Ok(records)
    }

    /// Delete a template by name; no-op (returns `NotFound`) if it never existed.
    pub async fn delete<T: TemplateRecord>(&self, name: &str) -> OrchResult<()> {
        let kind = T::kind();
        let _guard = self.lock_for(kind).write().await;
        let path = self.record_path(kind, name);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|_| OrchError::not_found(kind.label(), name))
    }
}

async fn load_record<T: TemplateRecord>(path: &Path) -> OrchResult<T> {
    let body = tokio::fs::read(path)
        .await
        .map_err(|e| OrchError::internal(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| OrchError::validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkDriver;

    #[tokio::test]
    async fn defaults_materialize_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());
        store.ensure_defaults().await.unwrap();

        let networks: Vec<NetworkTemplate> = store.list().await.unwrap();
        assert_eq!(networks.len(), 5);
        let dev_envs: Vec<DevEnvironmentTemplate> = store.list().await.unwrap();
        assert_eq!(dev_envs.len(), 4);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());
        let template = NetworkTemplate::new("custom", NetworkDriver::Bridge);
        store.save(&template).await.unwrap();

        let loaded: NetworkTemplate = store.get("custom").await.unwrap();
        assert_eq!(loaded.name, "custom");
    }

    #[tokio::test]
    async fn missing_template_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());
        let err = store.get::<NetworkTemplate>("missing").await.unwrap_err();
        assert_eq!(err.category(), "not_found");
    }

    #[tokio::test]
    async fn invalid_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());
        store.ensure_defaults().await.unwrap();
        tokio::fs::write(dir.path().join("network").join("broken.json"), b"not json")
            .await
            .unwrap();

        let networks: Vec<NetworkTemplate> = store.list().await.unwrap();
        assert_eq!(networks.len(), 5);
    }
}
