//! Test-only helpers: an in-memory progress store with scriptable failures.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::core::rubric::check_manifest;
use crate::core::types::{Level, TASK_VALID_MANIFEST, TaskSignal, TaskState, Verdict};
use crate::io::progress::{Progress, ProgressStore};

#[derive(Default)]
struct Records {
    players: BTreeSet<String>,
    levels: BTreeMap<(String, Level), (TaskState, Option<String>)>,
    fail: bool,
    updates: Vec<(String, Level, TaskSignal)>,
}

/// In-memory [`ProgressStore`] that mirrors the server's merge rules.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate task flags for a player and level.
    pub fn seed(&self, player_id: &str, level: Level, tasks: &[(&str, bool)]) {
        let mut records = self.lock();
        let entry = records
            .levels
            .entry((player_id.to_string(), level))
            .or_insert_with(|| (TaskState::for_level(level), None));
        for (task, completed) in tasks {
            entry.0.set(task, *completed);
        }
    }

    /// Make every subsequent request fail (or succeed again).
    pub fn fail_requests(&self, fail: bool) {
        self.lock().fail = fail;
    }

    pub fn registered(&self, player_id: &str) -> bool {
        self.lock().players.contains(player_id)
    }

    pub fn tasks(&self, player_id: &str, level: Level) -> TaskState {
        self.lock()
            .levels
            .get(&(player_id.to_string(), level))
            .map(|(tasks, _)| tasks.clone())
            .unwrap_or_else(|| TaskState::for_level(level))
    }

    /// Every update received, in arrival order.
    pub fn updates(&self) -> Vec<(String, Level, TaskSignal)> {
        self.lock().updates.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records> {
        self.records.lock().expect("memory store lock")
    }

    fn check_available(&self) -> Result<()> {
        if self.lock().fail {
            return Err(anyhow!("progress store unavailable"));
        }
        Ok(())
    }

    fn progress(&self, player_id: &str, level: Level) -> Progress {
        let records = self.lock();
        let (tasks, manifest) = records
            .levels
            .get(&(player_id.to_string(), level))
            .cloned()
            .unwrap_or_else(|| (TaskState::for_level(level), None));
        Progress {
            done: tasks.all_done(level.required_tasks()),
            tasks,
            manifest,
        }
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn register(&self, player_id: &str) -> Result<()> {
        self.check_available()?;
        self.lock().players.insert(player_id.to_string());
        Ok(())
    }

    async fn fetch(&self, player_id: &str, level: Level) -> Result<Progress> {
        self.check_available()?;
        Ok(self.progress(player_id, level))
    }

    async fn update(&self, player_id: &str, level: Level, signal: &TaskSignal) -> Result<Progress> {
        self.check_available()?;
        {
            let mut records = self.lock();
            records
                .updates
                .push((player_id.to_string(), level, signal.clone()));
            let entry = records
                .levels
                .entry((player_id.to_string(), level))
                .or_insert_with(|| (TaskState::for_level(level), None));
            entry.0.set(&signal.task, signal.completed);
        }
        Ok(self.progress(player_id, level))
    }

    async fn validate(&self, player_id: &str, manifest: &str) -> Result<Verdict> {
        self.check_available()?;
        let verdict = check_manifest(manifest);
        if verdict.ok {
            let mut records = self.lock();
            let entry = records
                .levels
                .entry((player_id.to_string(), Level::Manifest))
                .or_insert_with(|| (TaskState::for_level(Level::Manifest), None));
            entry.0.set(TASK_VALID_MANIFEST, true);
            entry.1 = Some(manifest.to_string());
        }
        Ok(verdict)
    }
}
