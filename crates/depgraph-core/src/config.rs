//! Workspace configuration (`.depgraph/config.json`).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding depgraph state inside a workspace.
pub const CONFIG_DIR: &str = ".depgraph";

/// Name of the config file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.json";

/// Workspace settings. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepgraphConfig {
    pub version: String,

    /// Directory of cached per-file summaries, relative to the workspace.
    pub summary_dir: PathBuf,

    /// Directory of the persisted graph snapshot, relative to the workspace.
    pub store_dir: PathBuf,

    /// WebSocket port for the graph server.
    pub port: u16,

    /// Bind to all interfaces instead of loopback.
    pub headless: bool,

    /// Quiet period before a burst of summary changes triggers a rebuild.
    pub debounce_ms: u64,

    /// Upper bound on a single build. Zero disables the limit.
    pub build_timeout_ms: u64,
}

impl Default for DepgraphConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            summary_dir: PathBuf::from(".lsp-analysis").join("files"),
            store_dir: PathBuf::from(CONFIG_DIR).join("db"),
            port: 7432,
            headless: false,
            debounce_ms: 150,
            build_timeout_ms: 30_000,
        }
    }
}

impl DepgraphConfig {
    /// Path of the config file for a workspace.
    pub fn path(workspace: &Path) -> PathBuf {
        workspace.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Loads the workspace config, falling back to defaults when absent.
    pub fn load(workspace: &Path) -> Result<Self> {
        let path = Self::path(workspace);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the config file, creating the state directory.
    pub fn save(&self, workspace: &Path) -> Result<PathBuf> {
        let path = Self::path(workspace);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn summary_dir(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.summary_dir)
    }

    pub fn store_dir(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.store_dir)
    }

    pub fn build_timeout(&self) -> Option<Duration> {
        (self.build_timeout_ms > 0).then(|| Duration::from_millis(self.build_timeout_ms))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempdir().unwrap();
        let config = DepgraphConfig::load(dir.path()).unwrap();
        assert_eq!(config, DepgraphConfig::default());
        assert_eq!(config.build_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        fs::write(
            DepgraphConfig::path(dir.path()),
            r#"{"port": 9000, "build_timeout_ms": 0}"#,
        )
        .unwrap();

        let config = DepgraphConfig::load(dir.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.debounce_ms, 150);
        assert_eq!(config.build_timeout(), None);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let config = DepgraphConfig {
            headless: true,
            ..Default::default()
        };
        config.save(dir.path()).unwrap();
        assert_eq!(DepgraphConfig::load(dir.path()).unwrap(), config);
    }
}
