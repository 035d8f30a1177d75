//! The `InstallerAdapter` contract (§4.7): per-ecosystem package operations
//! delegated out of this crate's scope. No concrete adapter ships here;
//! `pip`/`npm` subprocess shells are explicitly out of scope (§1).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::orch_error::OrchResult;

use super::source::DependencySource;

/// Options passed through to an installer adapter call; intentionally opaque
/// beyond a free-form key/value map, since adapters are out of scope here.
pub type InstallOptions = HashMap<String, String>;

/// A single resolved package entry, as reported by `list`.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    /// Package name.
    pub name: String,
    /// Installed version.
    pub version: String,
    /// Name of the source it was installed from.
    pub source: String,
}

/// Per-ecosystem package operations. Concrete implementations (talking to
/// `pip`, `npm`, etc.) are out of scope for this crate (§1); this trait and
/// the registry below exist so an embedding application can plug its own in.
#[async_trait]
pub trait InstallerAdapter: Send + Sync {
    /// Install `package` from `source`.
    async fn install(
        &self,
        package: &str,
        source: &DependencySource,
        opts: &InstallOptions,
    ) -> OrchResult<InstalledPackage>;

    /// Uninstall `package`.
    async fn uninstall(&self, package: &str, opts: &InstallOptions) -> OrchResult<()>;

    /// Update `package` to the latest version available from `source`.
    async fn update(
        &self,
        package: &str,
        source: &DependencySource,
        opts: &InstallOptions,
    ) -> OrchResult<InstalledPackage>;

    /// List installed packages.
    async fn list(&self, opts: &InstallOptions) -> OrchResult<Vec<InstalledPackage>>;

    /// Query the latest version of `package` available from `source`.
    async fn latest_version(
        &self,
        package: &str,
        source: &DependencySource,
    ) -> OrchResult<String>;
}

/// A registry of installer adapters keyed by ecosystem.
#[derive(Default, Clone)]
pub struct InstallerRegistry {
    adapters: HashMap<String, Arc<dyn InstallerAdapter>>,
}

impl InstallerRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter for `ecosystem_key` (see [`super::SourceType::key`]).
    pub fn register(&mut self, ecosystem_key: impl Into<String>, adapter: Arc<dyn InstallerAdapter>) {
        self.adapters.insert(ecosystem_key.into(), adapter);
    }

    /// Look up the adapter registered for an ecosystem, if any.
    #[must_use]
    pub fn get(&self, ecosystem_key: &str) -> Option<Arc<dyn InstallerAdapter>> {
        self.adapters.get(ecosystem_key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_has_no_adapters() {
        let registry = InstallerRegistry::new();
        assert!(registry.get("pypi").is_none());
    }
}
