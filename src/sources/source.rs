//! The [`DependencySource`] record and its runtime status (§3, §3.1).

use serde::{Deserialize, Serialize};

/// Package ecosystem a source serves, open-ended per §3.1's `Custom` variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Python Package Index.
    Pypi,
    /// Node Package Manager registry.
    Npm,
    /// Maven Central (or a compatible mirror).
    Maven,
    /// Any ecosystem not covered by the built-in variants.
    Custom(String),
}

impl SourceType {
    /// A stable key used to partition the registry by ecosystem.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Pypi => "pypi",
            Self::Npm => "npm",
            Self::Maven => "maven",
            Self::Custom(name) => name,
        }
    }
}

/// Runtime health status of a source, refreshed by [`super::SourcePool::check_health`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// Never checked.
    Unknown,
    /// Responded quickly and successfully.
    Online,
    /// Responded successfully but slowly, or the probe timed out.
    Slow,
    /// Probe failed to connect.
    Offline,
    /// Probe returned an unexpected error (e.g. non-200 status).
    Error,
}

/// A registry tag used to partition sources beyond ecosystem (§3: "group tag").
pub type SourceGroup = String;

/// A registered package source (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencySource {
    /// Source name, unique within its ecosystem.
    pub name: String,
    /// Base URL of the source.
    pub url: String,
    /// Ecosystem served.
    pub ecosystem: SourceType,
    /// Lower number = preferred.
    pub priority: i32,
    /// Grouping tag (e.g. "global", "china", "custom").
    pub group: SourceGroup,
    /// Whether the source may currently be selected.
    pub enabled: bool,
    /// Last-known health status.
    pub status: SourceStatus,
    /// Unix-epoch milliseconds of the last health check, if any.
    pub last_check: Option<i64>,
    /// Milliseconds the last successful probe took, if any.
    pub last_response_ms: Option<u64>,
    /// Successful probe/selection count.
    pub success_count: u64,
    /// Failed probe/selection count.
    pub error_count: u64,
}

impl DependencySource {
    /// Construct a source with otherwise-default fields.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, ecosystem: SourceType) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ecosystem,
            priority: 100,
            group: "global".to_string(),
            enabled: true,
            status: SourceStatus::Unknown,
            last_check: None,
            last_response_ms: None,
            success_count: 0,
            error_count: 0,
        }
    }

    /// Set the selection priority (lower = preferred).
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the grouping tag.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Whether this source is currently a candidate for selection: enabled
    /// and last known to be online (§4.7's best-source selection, step 2).
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.enabled && self.status == SourceStatus::Online
    }

    /// Whether the last check is older than `max_age` and should be refreshed
    /// before being trusted (§4.7's "stale > 1 h" rule).
    #[must_use]
    pub fn is_stale(&self, now_millis: i64, max_age_millis: i64) -> bool {
        match self.last_check {
            Some(last) => now_millis.saturating_sub(last) > max_age_millis,
            None => true,
        }
    }

    /// Record the outcome of a health check or selection attempt.
    pub fn record_check(&mut self, now_millis: i64, status: SourceStatus, response_ms: Option<u64>) {
        self.last_check = Some(now_millis);
        self.status = status;
        self.last_response_ms = response_ms;
        match status {
            SourceStatus::Online | SourceStatus::Slow => self.success_count += 1,
            SourceStatus::Offline | SourceStatus::Error => self.error_count += 1,
            SourceStatus::Unknown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_ecosystem_carries_its_own_key() {
        let custom = SourceType::Custom("rubygems".to_string());
        assert_eq!(custom.key(), "rubygems");
    }

    #[test]
    fn is_available_requires_enabled_and_online() {
        let mut source = DependencySource::new("pypi-main", "https://pypi.org", SourceType::Pypi);
        assert!(!source.is_available());
        source.record_check(0, SourceStatus::Online, Some(100));
        assert!(source.is_available());
        source.enabled = false;
        assert!(!source.is_available());
    }

    #[test]
    fn staleness_is_relative_to_last_check() {
        let mut source = DependencySource::new("pypi-main", "https://pypi.org", SourceType::Pypi);
        assert!(source.is_stale(10_000, 3_600_000));
        source.record_check(0, SourceStatus::Online, Some(50));
        assert!(!source.is_stale(10_000, 3_600_000));
        assert!(source.is_stale(4_000_000, 3_600_000));
    }

    #[test]
    fn record_check_increments_matching_counter() {
        let mut source = DependencySource::new("pypi-main", "https://pypi.org", SourceType::Pypi);
        source.record_check(0, SourceStatus::Online, Some(10));
        source.record_check(0, SourceStatus::Offline, None);
        assert_eq!(source.success_count, 1);
        assert_eq!(source.error_count, 1);
    }
}
