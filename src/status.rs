//! Read-only status summary for a manifest.
//!
//! Classifies every intervention against the current file state without
//! mutating anything, then aggregates counts by state and by target file.
//! The summary is deterministic for a given manifest and tree, and it is
//! consumed both as a text table and as `--json` machine output.

use crate::engine::comment::{self, Matches};
use crate::engine::{self, PatchError};
use crate::manifest::{Action, CommentTarget, RawIntervention};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Per-intervention classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Inject marker present, or every matched comment line prefixed.
    Applied,
    /// No trace of the intervention in the target.
    NotApplied,
    /// Some but not all matched comment lines carry the prefix.
    Partial,
    /// Target file does not exist.
    Missing,
    /// Record failed validation, or its match preconditions do not hold.
    Invalid,
}

impl State {
    fn label(self) -> &'static str {
        match self {
            State::Applied => "applied",
            State::NotApplied => "not_applied",
            State::Partial => "partial",
            State::Missing => "missing",
            State::Invalid => "invalid",
        }
    }
}

/// One row of the summary.
#[derive(Debug, Clone, Serialize)]
pub struct InterventionStatus {
    pub id: String,
    pub file: String,
    pub state: State,
    /// Human-readable reason, present for `invalid` rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-file aggregate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileSummary {
    pub interventions: usize,
    pub applied: usize,
}

/// Whole-manifest summary.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub interventions: Vec<InterventionStatus>,
    /// Counts keyed by state label.
    pub counts: BTreeMap<String, usize>,
    /// Aggregates keyed by target file.
    pub files: BTreeMap<String, FileSummary>,
}

/// Classify every record against the tree under `root`.
///
/// Validation failures become `invalid` rows here instead of hard errors:
/// status must be able to describe a manifest that apply would reject.
pub fn summarize(root: &Path, records: &[RawIntervention]) -> StatusSummary {
    let interventions: Vec<InterventionStatus> =
        records.iter().map(|record| classify(root, record)).collect();

    let mut counts = BTreeMap::new();
    let mut files: BTreeMap<String, FileSummary> = BTreeMap::new();
    for status in &interventions {
        *counts.entry(status.state.label().to_string()).or_insert(0) += 1;
        let entry = files.entry(status.file.clone()).or_default();
        entry.interventions += 1;
        if status.state == State::Applied {
            entry.applied += 1;
        }
    }

    StatusSummary {
        interventions,
        counts,
        files,
    }
}

fn classify(root: &Path, record: &RawIntervention) -> InterventionStatus {
    let fallback_id = record.id.clone().unwrap_or_else(|| "<missing id>".to_string());
    let fallback_file = record.file.clone().unwrap_or_else(|| "<missing file>".to_string());

    let intervention = match record.resolve() {
        Ok(intervention) => intervention,
        Err(error) => {
            return InterventionStatus {
                id: fallback_id,
                file: fallback_file,
                state: State::Invalid,
                detail: Some(error.to_string()),
            }
        }
    };

    let file = intervention.file.display().to_string();
    let target = root.join(&intervention.file);
    if !target.is_file() {
        return InterventionStatus {
            id: intervention.id,
            file,
            state: State::Missing,
            detail: None,
        };
    }

    let (state, detail) = match fs::read_to_string(&target) {
        Ok(text) => match action_state(&text, &intervention.id, &intervention.action) {
            Ok(state) => (state, None),
            Err(error) => (State::Invalid, Some(error.to_string())),
        },
        Err(error) => (State::Invalid, Some(format!("unreadable target: {error}"))),
    };

    InterventionStatus {
        id: intervention.id,
        file,
        state,
        detail,
    }
}

fn action_state(text: &str, id: &str, action: &Action) -> Result<State, PatchError> {
    match action {
        // Inject is all-or-nothing by marker presence.
        Action::Inject { .. } => Ok(if engine::carries_marker(text, id) {
            State::Applied
        } else {
            State::NotApplied
        }),
        Action::Comment {
            prefix,
            max_matches,
            target,
        } => comment_state(text, prefix, *max_matches, target),
    }
}

fn comment_state(
    text: &str,
    prefix: &str,
    max_matches: usize,
    target: &CommentTarget,
) -> Result<State, PatchError> {
    let (lines, _) = engine::split_lines(text);
    let matches: Matches = match target {
        CommentTarget::Line { identifier } => comment::match_lines(&lines, identifier)?,
        CommentTarget::Block { start, end } => comment::match_blocks(&lines, start, end)?,
    };
    comment::check_budget(&matches, max_matches)?;

    let prefixed = matches
        .line_indices
        .iter()
        .filter(|&&index| comment::is_prefixed(lines[index], prefix))
        .count();
    Ok(if prefixed == matches.line_indices.len() {
        State::Applied
    } else if prefixed == 0 {
        State::NotApplied
    } else {
        State::Partial
    })
}

/// Text rendering of the summary, one row per intervention plus aggregates.
pub fn render_text(summary: &StatusSummary) -> String {
    let mut out = String::new();
    for status in &summary.interventions {
        let _ = write!(out, "{:<12} {:<24} {}", status.state.label(), status.id, status.file);
        if let Some(detail) = &status.detail {
            let _ = write!(out, "  ({detail})");
        }
        out.push('\n');
    }
    out.push('\n');
    let counts = summary
        .counts
        .iter()
        .map(|(label, count)| format!("{count} {label}"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(
        out,
        "{} intervention(s) across {} file(s): {}",
        summary.interventions.len(),
        summary.files.len(),
        counts
    );
    out
}
