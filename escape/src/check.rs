//! Orchestration for the manifest level (`escape check`).

use std::io::Write;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::rubric::{ChecklistItem, check_manifest, checklist};
use crate::core::tracker::{Tracker, Transition};
use crate::core::types::{Level, TASK_VALID_MANIFEST, TaskSignal, Verdict};
use crate::io::progress::{Progress, ProgressStore};

/// Where a verdict was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    Remote,
    Local,
}

/// Session state for the manifest level.
#[derive(Debug, Clone)]
pub struct ManifestLevel {
    tracker: Tracker,
    verdict: Option<Verdict>,
    saved_manifest: Option<String>,
}

impl Default for ManifestLevel {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestLevel {
    pub fn new() -> Self {
        Self {
            tracker: Tracker::new(Level::Manifest),
            verdict: None,
            saved_manifest: None,
        }
    }

    /// Merge progress loaded from the store.
    pub fn load(&mut self, progress: &Progress) -> Transition {
        if progress.manifest.as_deref().is_some_and(|text| !text.trim().is_empty()) {
            self.saved_manifest = progress.manifest.clone();
        }
        self.tracker.merge_remote(&progress.tasks)
    }

    /// Record a fresh verdict.
    pub fn apply_verdict(&mut self, verdict: Verdict) -> Transition {
        let transition = self.tracker.record(&TaskSignal {
            task: TASK_VALID_MANIFEST.to_string(),
            completed: verdict.ok,
        });
        self.verdict = Some(verdict);
        transition
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    /// Last manifest the store accepted, if any.
    pub fn saved_manifest(&self) -> Option<&str> {
        self.saved_manifest.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.tracker.is_complete()
    }

    pub fn checklist(&self) -> Vec<ChecklistItem> {
        checklist(self.verdict.as_ref(), self.tracker.is_complete())
    }
}

/// Result of one `escape check` run.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub verdict: Verdict,
    pub source: VerdictSource,
    /// Checklist state before validating: what a returning player sees first.
    pub initial_checklist: Vec<ChecklistItem>,
    pub checklist: Vec<ChecklistItem>,
    pub level_complete: bool,
    pub celebrate: bool,
}

/// Load prior progress, validate `manifest`, and report.
///
/// Progress that is already complete when loaded is reported, not celebrated.
///
/// Remote validation is preferred; if the store is unreachable the local rule
/// checker produces the verdict instead.
pub async fn run_check(
    store: Option<&dyn ProgressStore>,
    player_id: &str,
    manifest: &str,
) -> CheckReport {
    let mut level = ManifestLevel::new();

    if let Some(store) = store {
        match store.fetch(player_id, Level::Manifest).await {
            Ok(progress) => {
                level.load(&progress);
            }
            Err(err) => warn!(error = %format!("{err:#}"), "could not load progress"),
        }
    }
    let initial_checklist = level.checklist();

    let (verdict, source) = match store {
        Some(store) => match store.validate(player_id, manifest).await {
            Ok(verdict) => (verdict, VerdictSource::Remote),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "remote validation failed, checking locally");
                (check_manifest(manifest), VerdictSource::Local)
            }
        },
        None => (check_manifest(manifest), VerdictSource::Local),
    };

    let passed = verdict.ok;
    let celebrate = level.apply_verdict(verdict.clone()) == Transition::Completed;
    info!(ok = passed, ?source, "manifest checked");

    if let (Some(store), VerdictSource::Local, true) = (store, source, passed) {
        if let Err(err) = store
            .update(player_id, Level::Manifest, &TaskSignal::done(TASK_VALID_MANIFEST))
            .await
        {
            warn!(error = %format!("{err:#}"), "could not record passing manifest");
        }
    }

    CheckReport {
        verdict,
        source,
        initial_checklist,
        checklist: level.checklist(),
        level_complete: level.is_complete(),
        celebrate,
    }
}

/// Manifest the store last accepted for `player_id`, if any.
pub async fn fetch_saved_manifest(
    store: &dyn ProgressStore,
    player_id: &str,
) -> Result<Option<String>> {
    let progress = store
        .fetch(player_id, Level::Manifest)
        .await
        .context("fetch level 2 progress")?;
    let mut level = ManifestLevel::new();
    level.load(&progress);
    Ok(level.saved_manifest().map(str::to_string))
}

/// Print a report: checklist, itemized errors and the completion banner.
///
/// A level that was complete before this check first gets its stored
/// checklist, then the checklist for the manifest just submitted.
pub fn render_report<W: Write>(out: &mut W, report: &CheckReport) -> Result<()> {
    let previously_complete = report.initial_checklist.iter().all(|item| item.satisfied);
    if previously_complete {
        writeln!(out, "{} was already completed earlier.", Level::Manifest.title())?;
        write_checklist(out, "Saved checklist:", &report.initial_checklist)?;
    }
    if report.source == VerdictSource::Local {
        writeln!(out, "(checked locally)")?;
    }
    write_checklist(out, "Checklist:", &report.checklist)?;
    if !report.verdict.errors.is_empty() {
        writeln!(out, "Errors:")?;
        for error in &report.verdict.errors {
            writeln!(out, "  - {error}")?;
        }
    }
    if report.verdict.ok {
        writeln!(out, "Manifest accepted.")?;
    }
    if report.celebrate {
        writeln!(out, "*** {} complete! You escaped. ***", Level::Manifest.title())?;
    }
    Ok(())
}

fn write_checklist<W: Write>(out: &mut W, heading: &str, items: &[ChecklistItem]) -> Result<()> {
    writeln!(out, "{heading}")?;
    for item in items {
        let mark = if item.satisfied { 'x' } else { ' ' };
        writeln!(out, "  [{mark}] {}", item.label)?;
    }
    Ok(())
}
