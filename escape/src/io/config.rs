//! Client configuration stored under `.escape/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default location of the client configuration, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".escape/config.toml";

/// Client configuration (TOML).
///
/// Missing fields default to a local development setup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EscapeConfig {
    /// Base URL of the progress store.
    pub server_url: String,

    /// Per-request timeout for progress store calls, in seconds.
    pub request_timeout_secs: u64,

    /// File holding the stable player identifier.
    pub player_id_path: PathBuf,
}

impl Default for EscapeConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 15,
            player_id_path: PathBuf::from(".escape/player_id"),
        }
    }
}

impl EscapeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(anyhow!("server_url must be non-empty"));
        }
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(anyhow!(
                "server_url must start with http:// or https:// (got '{}')",
                self.server_url
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.player_id_path.as_os_str().is_empty() {
            return Err(anyhow!("player_id_path must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EscapeConfig::default()`.
pub fn load_config(path: &Path) -> Result<EscapeConfig> {
    if !path.exists() {
        let cfg = EscapeConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EscapeConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EscapeConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
