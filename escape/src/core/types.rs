//! Shared deterministic types for the puzzle engine.
//!
//! These types define stable contracts between the interpreter, the rule
//! checker and the task tracker. They carry no I/O and serialize the same way
//! on the client and the progress server.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Task identifier: image pull of the bootstrap image.
pub const TASK_PULL: &str = "pull";
/// Task identifier: run of the canonical container.
pub const TASK_RUN: &str = "run";
/// Task identifier: any successful log view.
pub const TASK_LOGS: &str = "logs";
/// Task identifier: a manifest that passed every rubric rule.
pub const TASK_VALID_MANIFEST: &str = "validManifest";

/// Human-readable description of a task identifier.
pub fn task_label(task: &str) -> &str {
    match task {
        TASK_PULL => "Pull nginx",
        TASK_RUN => "Run container: web @ 8080:80",
        TASK_LOGS => "Show logs: web",
        TASK_VALID_MANIFEST => "Deployment manifest passes every check",
        other => other,
    }
}

/// A puzzle level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    /// Level 1: the simulated container CLI.
    Docker,
    /// Level 2: the deployment manifest checker.
    Manifest,
}

impl Level {
    pub const ALL: [Level; 2] = [Level::Docker, Level::Manifest];

    pub fn number(self) -> u8 {
        match self {
            Level::Docker => 1,
            Level::Manifest => 2,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.number() == number)
    }

    /// Task identifiers that must all be complete for the level to be done.
    pub fn required_tasks(self) -> &'static [&'static str] {
        match self {
            Level::Docker => &[TASK_PULL, TASK_RUN, TASK_LOGS],
            Level::Manifest => &[TASK_VALID_MANIFEST],
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Level::Docker => "Level 1 (Docker)",
            Level::Manifest => "Level 2 (Kubernetes manifest)",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.number()
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Level::from_number(value).ok_or_else(|| format!("unknown level {value}"))
    }
}

/// Completion signal emitted by the interpreter or the rule checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSignal {
    pub task: String,
    pub completed: bool,
}

impl TaskSignal {
    pub fn done(task: &str) -> Self {
        Self {
            task: task.to_string(),
            completed: true,
        }
    }
}

/// Task completion flags for one level.
///
/// Flags only ever move from `false` to `true`: every merge is a logical OR,
/// so applying updates in any order yields the same state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskState {
    flags: BTreeMap<String, bool>,
}

impl TaskState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State with every task of `level` present and unset.
    pub fn for_level(level: Level) -> Self {
        let flags = level
            .required_tasks()
            .iter()
            .map(|task| (task.to_string(), false))
            .collect();
        Self { flags }
    }

    pub fn is_done(&self, task: &str) -> bool {
        self.flags.get(task).copied().unwrap_or(false)
    }

    /// OR-merge a single flag. Returns true when the flag changed to `true`.
    pub fn set(&mut self, task: &str, completed: bool) -> bool {
        let entry = self.flags.entry(task.to_string()).or_insert(false);
        let newly_set = completed && !*entry;
        *entry = *entry || completed;
        newly_set
    }

    /// OR-merge every flag of `other` into `self`.
    pub fn merge(&mut self, other: &TaskState) {
        for (task, completed) in &other.flags {
            self.set(task, *completed);
        }
    }

    pub fn all_done(&self, tasks: &[&str]) -> bool {
        tasks.iter().all(|task| self.is_done(task))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(task, done)| (task.as_str(), *done))
    }
}

impl From<BTreeMap<String, bool>> for TaskState {
    fn from(flags: BTreeMap<String, bool>) -> Self {
        Self { flags }
    }
}

impl<'a> FromIterator<(&'a str, bool)> for TaskState {
    fn from_iter<I: IntoIterator<Item = (&'a str, bool)>>(iter: I) -> Self {
        let mut state = TaskState::new();
        for (task, completed) in iter {
            state.set(task, completed);
        }
        state
    }
}

/// Result of evaluating one rubric rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCheck {
    pub name: String,
    pub passed: bool,
}

/// Structured result of checking a manifest against the rubric.
///
/// `checks` always lists every rubric rule in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub ok: bool,
    pub checks: Vec<RuleCheck>,
    pub errors: Vec<String>,
}

impl Verdict {
    pub fn passed(&self, rule: &str) -> bool {
        self.checks
            .iter()
            .any(|check| check.name == rule && check.passed)
    }
}
