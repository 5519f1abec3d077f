// # File Config Store
//
// File-based implementation of ConfigStore.
//
// ## Purpose
//
// Reads the configuration from a JSON file once per load and caches the
// parsed snapshot keyed by the file's modification time, so the per-cycle
// reload only re-parses when the file actually changed on disk. External
// edits are picked up through the modification time; edits that preserve it
// are not detected until the next write.
//
// ## Write-Back
//
// Saves are atomic: the snapshot is written to a temporary file in the same
// directory and renamed over the target. The file carries `0600` permissions
// on Unix since it holds provider credentials.
//
// ## File Format
//
// ```json
// {
//   "cdn": { "enabled": true, "services": [ ... ] },
//   "dns": { "enabled": false, "services": [] },
//   "webhook": { "enabled": false, "url": "", "headers": "", "body": "" }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::traits::ConfigStore;
use crate::Error;

/// Parsed snapshot tagged with the file state it came from
#[derive(Debug, Clone)]
struct CachedConfig {
    modified: SystemTime,
    config: Config,
}

/// File-based config store with modification-time caching
///
/// # Example
///
/// ```rust,ignore
/// use edgesync_core::state::FileConfigStore;
/// use edgesync_core::ConfigStore;
///
/// let store = FileConfigStore::new("/etc/edgesync/edgesync.json");
/// let config = store.load().await?;
/// ```
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    cache: RwLock<Option<CachedConfig>>,
}

impl FileConfigStore {
    /// Create a store for a path; the file is read lazily on first load
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// The backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn modified_time(&self) -> Result<SystemTime, Error> {
        let meta = fs::metadata(&self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to stat config file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        meta.modified().map_err(|e| {
            Error::store(format!(
                "Config file {} has no modification time: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn read_and_parse(&self) -> Result<Config, Error> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to read config file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::store(format!(
                "Failed to parse config file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(config)
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> Result<Config, Error> {
        let modified = self.modified_time().await?;

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.modified == modified {
                    return Ok(cached.config.clone());
                }
            }
        }

        let config = self.read_and_parse().await?;
        {
            let mut cache = self.cache.write().await;
            *cache = Some(CachedConfig {
                modified,
                config: config.clone(),
            });
        }

        tracing::debug!(path = %self.path.display(), "config file (re)loaded");
        Ok(config)
    }

    async fn save(&self, config: &Config) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::store(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(config)?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // The file carries credentials; keep it owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| {
                    Error::store(format!(
                        "Failed to set permissions on {}: {}",
                        temp_path.display(),
                        e
                    ))
                })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        // Keep the cache current so the next load skips the re-parse.
        let modified = self.modified_time().await?;
        {
            let mut cache = self.cache.write().await;
            *cache = Some(CachedConfig {
                modified,
                config: config.clone(),
            });
        }

        tracing::debug!(path = %self.path.display(), "config file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CdnService, CdnVariant};
    use tempfile::tempdir;

    fn config_with_service(domain: &str) -> Config {
        let mut config = Config::default();
        config.cdn.enabled = true;
        config.cdn.services.push(CdnService {
            id: String::new(),
            name: String::new(),
            domain: domain.to_string(),
            provider: "aliyun".to_string(),
            variant: CdnVariant::Cdn,
            access_key: "ak".to_string(),
            access_secret: "sk".to_string(),
            cname: None,
            sources: Vec::new(),
        });
        config
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edgesync.json");

        let store = FileConfigStore::new(&path);
        store.save(&config_with_service("cdn.example.com")).await.unwrap();
        assert!(path.exists());

        // A fresh instance reads the same snapshot from disk.
        let other = FileConfigStore::new(&path);
        let loaded = other.load().await.unwrap();
        assert_eq!(loaded.cdn.services[0].domain, "cdn.example.com");
    }

    #[tokio::test]
    async fn loading_a_missing_file_fails() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn external_rewrites_are_picked_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edgesync.json");

        let store = FileConfigStore::new(&path);
        store.save(&config_with_service("a.example.com")).await.unwrap();
        assert_eq!(store.load().await.unwrap().cdn.services[0].domain, "a.example.com");

        // Another writer replaces the file.
        let writer = FileConfigStore::new(&path);
        writer.save(&config_with_service("b.example.com")).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded.cdn.services[0].domain, "b.example.com");
    }

    #[tokio::test]
    async fn malformed_json_is_a_store_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edgesync.json");
        fs::write(&path, b"{ not json").await.unwrap();

        let store = FileConfigStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("edgesync.json");

        let store = FileConfigStore::new(&path);
        store.save(&Config::default()).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
