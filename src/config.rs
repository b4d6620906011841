//! Worker configuration.
//!
//! Everything deployment-specific lives in [`CacheConfig`]: the version token that
//! names (and therefore invalidates) the cache partitions, the shell-asset manifest
//! pre-warmed at install, the offline fallback documents, and the path/host tables the
//! strategy selector consults. The config is serde-derived so a deployment can ship it
//! as JSON next to the worker script.

use crate::cache::PartitionKind;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

lazy_static! {
    /// Path prefixes that are never cached, regardless of any other rule.
    ///
    /// Login, logout, and identity-provider callback exchanges must reach the network
    /// untouched: caching a credential redirect is strictly worse than failing.
    static ref DEFAULT_AUTH_PATHS: Vec<String> = vec![
        "/login".to_string(),
        "/logout".to_string(),
        "/callback".to_string(),
        "/auth".to_string(),
        "/api/auth".to_string(),
    ];
}

/// Bounds on what a single partition will hold.
///
/// These exist to model the host's storage quota: exceeding a bound surfaces as
/// [`CacheError::LimitExceeded`][crate::cache::CacheError::LimitExceeded], which the
/// strategies swallow — a response the store refuses is still returned to the page.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct StoreLimits {
    /// Maximum number of entries a partition will hold.
    #[serde(default = "StoreLimits::default_max_entries")]
    pub max_entries_per_partition: usize,
    /// Maximum size in bytes of a single stored body.
    #[serde(default = "StoreLimits::default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl StoreLimits {
    fn default_max_entries() -> usize {
        512
    }

    fn default_max_body_bytes() -> usize {
        8 * 1024 * 1024
    }
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_entries_per_partition: Self::default_max_entries(),
            max_body_bytes: Self::default_max_body_bytes(),
        }
    }
}

/// Configuration for a deployed worker version.
///
/// The `version` token is the sole global invalidation mechanism: it is embedded in
/// every partition name, and the activate step deletes every partition whose name does
/// not carry the current token.
///
/// ```
/// use sw_cache::CacheConfig;
/// let config: CacheConfig = serde_json::from_str(
///     r#"{ "version": "v3", "api_prefix": "/api" }"#,
/// ).unwrap();
/// assert_eq!(config.partition_name(sw_cache::cache::PartitionKind::Static), "static-v3");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// The deployment version token, e.g. `"v3"`.
    pub version: String,
    /// The origin the worker controls, e.g. `"https://reawakened.app"`.
    pub origin: String,
    /// Paths of the shell assets pre-warmed into the static partition at install.
    pub shell_manifest: Vec<String>,
    /// Path of the offline fallback document served for failed navigations.
    pub offline_page: String,
    /// Path of the root document, the last-resort navigation fallback.
    pub root_document: String,
    /// Path prefix under which requests are API calls.
    pub api_prefix: String,
    /// Path prefixes that always bypass the cache (auth exchanges).
    pub auth_paths: Vec<String>,
    /// Cross-origin hosts that always bypass the cache (identity providers).
    pub bypass_hosts: Vec<String>,
    /// Per-path-prefix max-age, in seconds.
    ///
    /// Consulted only by Stale-While-Revalidate, which skips the background
    /// revalidation while a cached entry is younger than its prefix's max-age. No
    /// strategy ever rejects an entry for being older.
    pub max_age_secs: HashMap<String, u64>,
    /// Bounds on partition contents.
    pub limits: StoreLimits,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            origin: "https://reawakened.app".to_string(),
            shell_manifest: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/offline.html".to_string(),
                "/manifest.json".to_string(),
            ],
            offline_page: "/offline.html".to_string(),
            root_document: "/".to_string(),
            api_prefix: "/api".to_string(),
            auth_paths: DEFAULT_AUTH_PATHS.clone(),
            bypass_hosts: Vec::new(),
            max_age_secs: HashMap::new(),
            limits: StoreLimits::default(),
        }
    }
}

impl CacheConfig {
    /// Load a configuration from its JSON representation.
    ///
    /// Missing fields take their defaults, so a deployment only states what it
    /// overrides.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The partition name for the given kind under this version, e.g. `static-v3`.
    pub fn partition_name(&self, kind: PartitionKind) -> String {
        format!("{}-{}", kind.as_str(), self.version)
    }

    /// The three partition names belonging to this version.
    ///
    /// Every other partition name is garbage to the activate step.
    pub fn current_partition_names(&self) -> [String; 3] {
        [
            self.partition_name(PartitionKind::Static),
            self.partition_name(PartitionKind::Dynamic),
            self.partition_name(PartitionKind::Api),
        ]
    }

    /// Return whether the given path falls under the API prefix.
    pub fn is_api_path(&self, path: &str) -> bool {
        path.starts_with(&self.api_prefix)
    }

    /// Return whether the given path is an auth exchange that must bypass the cache.
    pub fn is_auth_path(&self, path: &str) -> bool {
        self.auth_paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Return whether the given host is a configured identity-provider bypass host.
    pub fn is_bypass_host(&self, host: &str) -> bool {
        self.bypass_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    /// The absolute URL for an app path, e.g. `/offline.html` on the configured origin.
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.origin.trim_end_matches('/'), path)
    }

    /// The configured max-age for the given path, from the longest matching prefix.
    pub fn max_age_for(&self, path: &str) -> Option<Duration> {
        self.max_age_secs
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, secs)| Duration::from_secs(*secs))
    }
}
