//! Per-level task tracking with a one-shot completion edge.

use crate::core::types::{Level, TaskSignal, TaskState};

/// Level completion state. `Complete` is terminal for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelPhase {
    Incomplete,
    Complete,
}

/// Edge produced by applying an update to a [`Tracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed at the level scope.
    Unchanged,
    /// The level moved from incomplete to complete. Emitted at most once.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracker {
    level: Level,
    tasks: TaskState,
    phase: LevelPhase,
}

impl Tracker {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            tasks: TaskState::for_level(level),
            phase: LevelPhase::Incomplete,
        }
    }

    pub fn tasks(&self) -> &TaskState {
        &self.tasks
    }

    pub fn phase(&self) -> LevelPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == LevelPhase::Complete
    }

    /// Apply a locally derived completion signal.
    pub fn record(&mut self, signal: &TaskSignal) -> Transition {
        self.tasks.set(&signal.task, signal.completed);
        self.advance()
    }

    /// Merge flags reported by the progress store.
    ///
    /// Remote `false` never clears a local `true`, so stale responses are
    /// harmless.
    pub fn merge_remote(&mut self, remote: &TaskState) -> Transition {
        self.tasks.merge(remote);
        self.advance()
    }

    fn advance(&mut self) -> Transition {
        match self.phase {
            LevelPhase::Complete => Transition::Unchanged,
            LevelPhase::Incomplete if self.tasks.all_done(self.level.required_tasks()) => {
                self.phase = LevelPhase::Complete;
                Transition::Completed
            }
            LevelPhase::Incomplete => Transition::Unchanged,
        }
    }
}
