//! Stable per-machine player identifier.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

/// Minimum length accepted by the progress store.
pub const MIN_PLAYER_ID_LEN: usize = 3;

/// Read the player id at `path`, generating and storing a new one if missing.
pub fn load_or_create_player_id(path: &Path) -> Result<String> {
    if path.exists() {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let id = contents.trim().to_string();
        if id.len() < MIN_PLAYER_ID_LEN {
            bail!(
                "player id in {} must be at least {} characters",
                path.display(),
                MIN_PLAYER_ID_LEN
            );
        }
        debug!(path = %path.display(), "loaded player id");
        return Ok(id);
    }

    let id = uuid::Uuid::new_v4().to_string();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, format!("{id}\n")).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "created player id");
    Ok(id)
}
