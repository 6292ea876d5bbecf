//! Transactional application of a manifest.
//!
//! One run moves through `INIT -> BACKUP -> APPLY_EACH -> (COMMIT | ROLLBACK)`:
//! every distinct target file is snapshotted into a transaction-scoped temp
//! directory before the first mutation, interventions run strictly in
//! manifest order, and the first operation failure restores every snapshot.
//! Either the whole manifest lands or no file differs from its pre-run state.
//!
//! The guarantee covers handled failures only. Individual writes go through
//! a temp-file-then-rename in the target's directory, so an unclean kill
//! mid-run leaves at most the already-committed subset mutated; full
//! atomicity across a kill is explicitly not promised.

use crate::engine::{self, Toggle};
use crate::manifest::{Action, CommentTarget, Intervention};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Direction of a run: apply the manifest or take it back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Apply,
    Remove,
}

/// What a completed run did, by intervention id.
#[derive(Debug, Default)]
pub struct RunReport {
    pub changed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Run every intervention against `root`, all-or-nothing.
pub fn run(root: &Path, interventions: &[Intervention], mode: RunMode) -> Result<RunReport> {
    let backup = TempDir::new().context("create transaction backup dir")?;
    let saved = snapshot_targets(root, interventions, backup.path())?;

    let mut report = RunReport::default();
    let mut touched: BTreeSet<PathBuf> = BTreeSet::new();

    for intervention in interventions {
        match run_one(root, intervention, mode, &mut touched) {
            Ok(Outcome::Changed) => {
                tracing::info!(
                    id = %intervention.id,
                    file = %intervention.file.display(),
                    "intervention written"
                );
                report.changed.push(intervention.id.clone());
            }
            Ok(Outcome::Skipped) => {
                tracing::debug!(
                    id = %intervention.id,
                    file = %intervention.file.display(),
                    "intervention already in place, skipped"
                );
                report.skipped.push(intervention.id.clone());
            }
            Err(error) => {
                restore_all(root, &saved);
                return Err(error.context(format!(
                    "intervention {:?} on {} failed, all files rolled back",
                    intervention.id,
                    intervention.file.display()
                )));
            }
        }
    }

    // COMMIT: dropping the TempDir discards every snapshot.
    Ok(report)
}

enum Outcome {
    Changed,
    Skipped,
}

/// BACKUP phase: one snapshot per distinct target, before any mutation.
///
/// A missing target is a precondition failure and aborts the whole run here,
/// while nothing has been written yet.
fn snapshot_targets(
    root: &Path,
    interventions: &[Intervention],
    backup_root: &Path,
) -> Result<BTreeMap<PathBuf, PathBuf>> {
    let mut saved = BTreeMap::new();
    for intervention in interventions {
        if saved.contains_key(&intervention.file) {
            continue;
        }
        let target = root.join(&intervention.file);
        if !target.is_file() {
            bail!(
                "target file {} for intervention {:?} is missing",
                target.display(),
                intervention.id
            );
        }
        let copy = backup_root.join(&intervention.file);
        if let Some(parent) = copy.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::copy(&target, &copy).with_context(|| format!("back up {}", target.display()))?;
        saved.insert(intervention.file.clone(), copy);
    }
    Ok(saved)
}

fn run_one(
    root: &Path,
    intervention: &Intervention,
    mode: RunMode,
    touched: &mut BTreeSet<PathBuf>,
) -> Result<Outcome> {
    let target = root.join(&intervention.file);
    let text = fs::read_to_string(&target)
        .with_context(|| format!("read {}", target.display()))?;

    let Some(next) = transform(&text, intervention, mode).map_err(|error| anyhow!(error))? else {
        return Ok(Outcome::Skipped);
    };

    if touched.insert(intervention.file.clone()) {
        unstage_from_index(root, &intervention.file);
    }
    write_text(&target, &next)?;
    Ok(Outcome::Changed)
}

/// Pure transform step: `Ok(None)` means the file already has the desired
/// state and the intervention is an idempotent no-op.
fn transform(
    text: &str,
    intervention: &Intervention,
    mode: RunMode,
) -> Result<Option<String>, engine::PatchError> {
    match (&intervention.action, mode) {
        (Action::Inject { anchor, position, lines }, RunMode::Apply) => {
            if engine::carries_marker(text, &intervention.id) {
                return Ok(None);
            }
            engine::inject(text, anchor, *position, lines).map(Some)
        }
        (Action::Inject { .. }, RunMode::Remove) => {
            engine::remove_block(text, &intervention.id)
        }
        (Action::Comment { prefix, max_matches, target }, mode) => {
            let toggle = match mode {
                RunMode::Apply => Toggle::Apply,
                RunMode::Remove => Toggle::Remove,
            };
            let next = match target {
                CommentTarget::Line { identifier } => {
                    engine::toggle_lines(text, identifier, prefix, *max_matches, toggle)?
                }
                CommentTarget::Block { start, end } => {
                    engine::toggle_blocks(text, start, end, prefix, *max_matches, toggle)?
                }
            };
            Ok((next != text).then_some(next))
        }
    }
}

/// Replace `path` atomically via a temp file in the same directory.
///
/// The replacement carries over the target's existing permissions; the temp
/// file is created with umask defaults, so an executable script or a 0600
/// dotfile would otherwise come out of a run with its mode reset.
fn write_text(path: &Path, text: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("target");
    let tmp = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{file_name}.tmp"));
    fs::write(&tmp, text).with_context(|| format!("write {}", tmp.display()))?;
    let permissions = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();
    fs::set_permissions(&tmp, permissions)
        .with_context(|| format!("set permissions on {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// ROLLBACK phase: best-effort restore of every snapshot.
fn restore_all(root: &Path, saved: &BTreeMap<PathBuf, PathBuf>) {
    for (rel, copy) in saved {
        let target = root.join(rel);
        if let Err(error) = fs::copy(copy, &target) {
            tracing::warn!(
                file = %target.display(),
                %error,
                "rollback failed to restore file"
            );
        }
    }
    tracing::info!("rolled back {} file(s)", saved.len());
}

/// Courtesy unstage of a tracked file so the run never mutates content that
/// is sitting staged in an enclosing git index. Best effort: no git, no
/// repository, or a failing reset are all ignored.
fn unstage_from_index(root: &Path, rel: &Path) {
    if !root.join(".git").exists() {
        return;
    }
    let Ok(git) = which::which("git") else {
        return;
    };
    let status = Command::new(git)
        .arg("-C")
        .arg(root)
        .args(["reset", "-q", "--"])
        .arg(rel)
        .status();
    match status {
        Ok(status) if status.success() => {
            tracing::debug!(file = %rel.display(), "unstaged from git index");
        }
        Ok(status) => {
            tracing::warn!(file = %rel.display(), %status, "git reset failed");
        }
        Err(error) => {
            tracing::warn!(file = %rel.display(), %error, "could not run git reset");
        }
    }
}
