//! Orchestration for the Docker level (`escape play`).
//!
//! [`DockerLevel`] combines the pure interpreter with the task tracker and the
//! sync client. [`run_repl`] drives it from a single event loop that handles
//! either one input line or one network response at a time.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::core::interpreter::{BANNER, Screen, Session, interpret};
use crate::core::tracker::{Tracker, Transition};
use crate::core::types::{Level, TaskState, task_label};
use crate::io::sync::{SyncClient, SyncEvent};

pub const PROMPT: &str = "player@escape:~$ ";
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// What the terminal should render after one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub lines: Vec<String>,
    pub screen: Screen,
    /// Tasks that became complete while handling the event.
    pub completed_tasks: Vec<String>,
    /// True exactly once per session: when the level becomes complete.
    pub celebrate: bool,
}

/// Session state for the Docker level.
pub struct DockerLevel {
    session: Session,
    tracker: Tracker,
    sync: SyncClient,
}

impl DockerLevel {
    pub fn new(sync: SyncClient) -> Self {
        Self {
            session: Session::default(),
            tracker: Tracker::new(Level::Docker),
            sync,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Ask the progress store for prior progress.
    pub fn start(&self) {
        self.sync.request_load();
    }

    /// Interpret one input line and forward resulting task signals.
    pub fn handle_line(&mut self, line: &str, now: DateTime<Local>) -> Frame {
        let (reply, session) = interpret(&self.session, line, now);
        self.session = session;

        let before = self.tracker.tasks().clone();
        let mut celebrate = false;
        for signal in &reply.signals {
            if self.tracker.record(signal) == Transition::Completed {
                celebrate = true;
            }
            self.sync.push(signal.clone());
        }

        Frame {
            lines: reply.lines,
            screen: reply.screen,
            completed_tasks: newly_completed(&before, self.tracker.tasks()),
            celebrate,
        }
    }

    /// Merge a network response into local state.
    pub fn handle_sync(&mut self, event: SyncEvent, now: DateTime<Local>) -> Frame {
        match event {
            SyncEvent::Loaded(progress) | SyncEvent::Updated(progress) => {
                let before = self.tracker.tasks().clone();
                let transition = self.tracker.merge_remote(&progress.tasks);
                self.session = self.session.restore(self.tracker.tasks(), now);
                debug!(complete = self.tracker.is_complete(), "merged remote progress");
                Frame {
                    completed_tasks: newly_completed(&before, self.tracker.tasks()),
                    celebrate: transition == Transition::Completed,
                    ..Frame::default()
                }
            }
            SyncEvent::Failed { .. } => Frame::default(),
        }
    }
}

fn newly_completed(before: &TaskState, after: &TaskState) -> Vec<String> {
    after
        .iter()
        .filter(|(task, done)| *done && !before.is_done(task))
        .map(|(task, _)| task.to_string())
        .collect()
}

/// Run the interactive loop until `input` reaches end of file.
pub async fn run_repl<R, W>(
    mut level: DockerLevel,
    mut events: UnboundedReceiver<SyncEvent>,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    for line in BANNER {
        writeln!(out, "{line}")?;
    }
    level.start();
    write!(out, "{PROMPT}")?;
    out.flush()?;

    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("read input")? else {
                    break;
                };
                let frame = level.handle_line(&line, Local::now());
                render(out, &frame)?;
                write!(out, "{PROMPT}")?;
                out.flush()?;
            }
            Some(event) = events.recv() => {
                let frame = level.handle_sync(event, Local::now());
                if frame != Frame::default() {
                    writeln!(out)?;
                    render(out, &frame)?;
                    write!(out, "{PROMPT}")?;
                    out.flush()?;
                }
            }
        }
    }

    writeln!(out)?;
    info!(complete = level.tracker().is_complete(), "session ended");
    Ok(())
}

fn render<W: Write>(out: &mut W, frame: &Frame) -> Result<()> {
    if frame.screen == Screen::Clear {
        write!(out, "{CLEAR_SCREEN}")?;
    }
    for line in &frame.lines {
        writeln!(out, "{line}")?;
    }
    for task in &frame.completed_tasks {
        writeln!(out, "[done] {}", task_label(task))?;
    }
    if frame.celebrate {
        writeln!(out, "*** {} complete! Next: escape check <manifest> ***", Level::Docker.title())?;
    }
    Ok(())
}
