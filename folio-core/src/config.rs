//! Runtime configuration

use crate::net::RetryPolicy;
use crate::sources::{wikipedia_for_language, SourceEndpoints};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Settings for the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub retry: RetryPolicy,

    /// Connect and read timeout for every request
    pub http_timeout_secs: u64,

    pub user_agent: String,

    pub endpoints: SourceEndpoints,

    /// Search candidates whose work/edition records are fetched
    pub search_detail_limit: usize,

    /// Directory of the downloaded-cover cache
    pub cover_cache_dir: PathBuf,

    /// Directory receiving a copy of each container before it is rebuilt
    pub backup_dir: PathBuf,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            http_timeout_secs: 10,
            user_agent: format!("folio/{}", env!("CARGO_PKG_VERSION")),
            endpoints: SourceEndpoints::default(),
            search_detail_limit: crate::sources::openlibrary::DEFAULT_DETAIL_LIMIT,
            cover_cache_dir: PathBuf::from(".cover_cache"),
            backup_dir: PathBuf::from("backups"),
        }
    }
}

impl FolioConfig {
    /// Defaults overlaid with `FOLIO_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlay values from a variable lookup. Unparsable numbers are ignored
    /// with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = get("FOLIO_CACHE_DIR") {
            self.cover_cache_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("FOLIO_BACKUP_DIR") {
            self.backup_dir = PathBuf::from(dir);
        }
        if let Some(value) = get("FOLIO_MAX_RETRIES") {
            match value.parse::<u32>() {
                Ok(n) if n > 0 => self.retry.max_retries = n,
                _ => warn!(value = %value, "ignoring invalid FOLIO_MAX_RETRIES"),
            }
        }
        if let Some(value) = get("FOLIO_HTTP_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(n) if n > 0 => self.http_timeout_secs = n,
                _ => warn!(value = %value, "ignoring invalid FOLIO_HTTP_TIMEOUT_SECS"),
            }
        }
        if let Some(lang) = get("FOLIO_WIKIPEDIA_LANG") {
            self.endpoints.wikipedia = wikipedia_for_language(&lang);
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = FolioConfig::default();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.cover_cache_dir, PathBuf::from(".cover_cache"));
        assert_eq!(config.backup_dir, PathBuf::from("backups"));
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("FOLIO_CACHE_DIR", "/tmp/covers"),
            ("FOLIO_MAX_RETRIES", "2"),
            ("FOLIO_HTTP_TIMEOUT_SECS", "soon"),
            ("FOLIO_WIKIPEDIA_LANG", "en"),
        ]
        .into();
        let mut config = FolioConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.cover_cache_dir, PathBuf::from("/tmp/covers"));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.http_timeout_secs, 10);
        assert_eq!(config.endpoints.wikipedia, "https://en.wikipedia.org");
        assert_eq!(config.backup_dir, PathBuf::from("backups"));
    }

    #[test]
    fn test_partial_json() {
        let config: FolioConfig =
            serde_json::from_str(r#"{"http_timeout_secs": 3, "retry": {"max_retries": 1}}"#)
                .unwrap();
        assert_eq!(config.http_timeout_secs, 3);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.max_backoff_secs, 30.0);
    }
}
