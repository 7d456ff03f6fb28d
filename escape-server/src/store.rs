//! Player progress database.
//!
//! Flags are merged with OR semantics: an update with `completed: false`
//! never clears a stored flag, so repeated or reordered updates converge.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use escape::core::types::{Level, TASK_VALID_MANIFEST, TaskState};
use escape::wire::ProgressResponse;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LevelRecord {
    tasks: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    manifest: Option<String>,
}

/// Registered players and their per-level records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressDb {
    players: BTreeSet<String>,
    /// player id -> level number -> record
    progress: BTreeMap<String, BTreeMap<u8, LevelRecord>>,
}

impl ProgressDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; a missing file is an empty database.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }

    /// Atomically rewrite the JSON file (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut payload = serde_json::to_string_pretty(self).context("serialize progress")?;
        payload.push('\n');
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        {
            let mut file =
                fs::File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
            file.write_all(payload.as_bytes())
                .with_context(|| format!("write {}", tmp.display()))?;
            file.sync_all()
                .with_context(|| format!("sync {}", tmp.display()))?;
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    }

    /// Returns true when the player was not known before.
    pub fn register(&mut self, player_id: &str) -> bool {
        self.players.insert(player_id.to_string())
    }

    pub fn is_registered(&self, player_id: &str) -> bool {
        self.players.contains(player_id)
    }

    /// Current progress; every required task of the level is listed.
    pub fn progress(&self, player_id: &str, level: Level) -> ProgressResponse {
        let record = self
            .progress
            .get(player_id)
            .and_then(|levels| levels.get(&level.number()));
        let mut tasks = TaskState::for_level(level);
        if let Some(record) = record {
            tasks.merge(&record.tasks);
        }
        ProgressResponse {
            player_id: player_id.to_string(),
            level,
            done: tasks.all_done(level.required_tasks()),
            tasks,
            manifest: record.and_then(|record| record.manifest.clone()),
        }
    }

    /// OR-merge one task flag and return the resulting progress.
    pub fn update(
        &mut self,
        player_id: &str,
        level: Level,
        task: &str,
        completed: bool,
    ) -> ProgressResponse {
        self.record_mut(player_id, level).tasks.set(task, completed);
        self.progress(player_id, level)
    }

    /// Store a manifest that passed every check and mark level 2 solved.
    pub fn record_manifest(&mut self, player_id: &str, manifest: &str) {
        let record = self.record_mut(player_id, Level::Manifest);
        record.tasks.set(TASK_VALID_MANIFEST, true);
        record.manifest = Some(manifest.to_string());
    }

    fn record_mut(&mut self, player_id: &str, level: Level) -> &mut LevelRecord {
        self.progress
            .entry(player_id.to_string())
            .or_default()
            .entry(level.number())
            .or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escape::core::types::{TASK_LOGS, TASK_PULL, TASK_RUN};

    #[test]
    fn unknown_player_gets_every_required_task_unset() {
        let db = ProgressDb::new();
        let progress = db.progress("player-1", Level::Docker);
        assert_eq!(progress.tasks, TaskState::for_level(Level::Docker));
        assert!(!progress.done);
        assert_eq!(progress.manifest, None);
    }

    #[test]
    fn false_update_never_clears_a_flag() {
        let mut db = ProgressDb::new();
        db.update("player-1", Level::Docker, TASK_PULL, true);
        let progress = db.update("player-1", Level::Docker, TASK_PULL, false);
        assert!(progress.tasks.is_done(TASK_PULL));
    }

    #[test]
    fn done_requires_every_task_of_the_level() {
        let mut db = ProgressDb::new();
        db.update("player-1", Level::Docker, TASK_PULL, true);
        db.update("player-1", Level::Docker, TASK_RUN, true);
        assert!(!db.progress("player-1", Level::Docker).done);
        let progress = db.update("player-1", Level::Docker, TASK_LOGS, true);
        assert!(progress.done);
        assert!(!db.progress("player-1", Level::Manifest).done);
    }

    #[test]
    fn recorded_manifest_completes_level_two() {
        let mut db = ProgressDb::new();
        db.record_manifest("player-1", "kind: Deployment\n");
        let progress = db.progress("player-1", Level::Manifest);
        assert!(progress.done);
        assert_eq!(progress.manifest.as_deref(), Some("kind: Deployment\n"));
    }

    #[test]
    fn save_then_load_restores_players_and_flags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("progress.json");

        let mut db = ProgressDb::new();
        assert!(db.register("player-1"));
        assert!(!db.register("player-1"));
        db.update("player-1", Level::Docker, TASK_RUN, true);
        db.save(&path).expect("save");

        let loaded = ProgressDb::load(&path).expect("load");
        assert_eq!(loaded, db);
        assert!(loaded.is_registered("player-1"));
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = ProgressDb::load(&dir.path().join("absent.json")).expect("load");
        assert_eq!(db, ProgressDb::new());
    }
}
