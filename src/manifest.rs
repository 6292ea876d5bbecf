//! Manifest loading and validation.
//!
//! A manifest is an ordered list of intervention records, either as a
//! top-level JSON array or wrapped in `{ "interventions": [...] }`. Order is
//! preserved end to end because apply order matters: a later anchor may sit
//! inside text an earlier intervention injected.
//!
//! Records are deserialized loosely ([`RawIntervention`], everything
//! optional) and then resolved into the typed [`Intervention`] model. The
//! strict path ([`resolve_all`]) is what apply/remove use: the first invalid
//! record aborts before any file is touched. The status reporter instead
//! resolves record by record so a bad entry shows up as `invalid` in the
//! summary rather than killing the read-only pass.

use crate::engine::{begin_token, end_token, token_on_line};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One validated edit instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intervention {
    /// Unique within the manifest; doubles as the marker token seed.
    pub id: String,
    /// Target path, relative to the run root.
    pub file: PathBuf,
    pub action: Action,
}

/// What an intervention does to its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Inject {
        anchor: String,
        position: Position,
        lines: Vec<String>,
    },
    Comment {
        prefix: String,
        max_matches: usize,
        target: CommentTarget,
    },
}

/// Where an injected block lands relative to its anchor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Before,
    After,
}

/// What a comment intervention matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    Line { identifier: String },
    Block { start: String, end: String },
}

/// Per-record validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("intervention is missing an id")]
    MissingId,

    #[error("intervention {0:?} is missing a target file")]
    MissingFile(String),

    #[error("intervention {id:?} has unknown type {kind:?}")]
    UnknownType { id: String, kind: String },

    #[error("inject intervention {0:?} is missing an anchor")]
    MissingAnchor(String),

    #[error("inject intervention {0:?} is missing a position")]
    MissingPosition(String),

    #[error("inject intervention {id:?} has invalid position {position:?} (want before or after)")]
    InvalidPosition { id: String, position: String },

    #[error("inject intervention {0:?} is missing lines")]
    MissingLines(String),

    #[error("inject intervention {0:?} lines do not carry its own BEGIN/END markers")]
    MarkersMissing(String),

    #[error("comment intervention {0:?} is missing a comment prefix")]
    MissingPrefix(String),

    #[error("comment intervention {id:?} has invalid max_matches {value} (want a positive integer)")]
    InvalidMaxMatches { id: String, value: i64 },

    #[error("comment intervention {0:?} must set exactly one of identifier or block_start+block_end")]
    AmbiguousMode(String),

    #[error("duplicate intervention id {0:?}")]
    DuplicateId(String),
}

/// One manifest record as written, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIntervention {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    // inject fields
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub lines: Option<Vec<String>>,

    // comment fields
    #[serde(default)]
    pub comment_prefix: Option<String>,
    #[serde(default)]
    pub max_matches: Option<i64>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub block_start: Option<String>,
    #[serde(default)]
    pub block_end: Option<String>,
}

/// Accepted top-level manifest shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Document {
    Array(Vec<RawIntervention>),
    Wrapped { interventions: Vec<RawIntervention> },
}

/// Read and parse a manifest file into raw records, preserving order.
///
/// JSON shape errors are fatal here even for the read-only status path;
/// per-record semantic validation happens in [`RawIntervention::resolve`].
pub fn load_records(path: &Path) -> Result<Vec<RawIntervention>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read manifest {}", path.display()))?;
    let document: Document = serde_json::from_str(&raw)
        .with_context(|| format!("parse manifest {}", path.display()))?;
    Ok(match document {
        Document::Array(records) => records,
        Document::Wrapped { interventions } => interventions,
    })
}

/// Strictly resolve every record, rejecting duplicates.
pub fn resolve_all(records: &[RawIntervention]) -> Result<Vec<Intervention>, ManifestError> {
    let mut seen = BTreeSet::new();
    let mut interventions = Vec::with_capacity(records.len());
    for record in records {
        let intervention = record.resolve()?;
        if !seen.insert(intervention.id.clone()) {
            return Err(ManifestError::DuplicateId(intervention.id));
        }
        interventions.push(intervention);
    }
    Ok(interventions)
}

impl RawIntervention {
    /// Validate one record into the typed model.
    pub fn resolve(&self) -> Result<Intervention, ManifestError> {
        let id = match self.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(ManifestError::MissingId),
        };
        let file = match self.file.as_deref() {
            Some(file) if !file.is_empty() => PathBuf::from(file),
            _ => return Err(ManifestError::MissingFile(id)),
        };

        // Shell ancestry: a record without a type is an inject.
        let action = match self.kind.as_deref().unwrap_or("inject") {
            "inject" => self.resolve_inject(&id)?,
            "comment" => self.resolve_comment(&id)?,
            other => {
                return Err(ManifestError::UnknownType {
                    id,
                    kind: other.to_string(),
                })
            }
        };

        Ok(Intervention { id, file, action })
    }

    fn resolve_inject(&self, id: &str) -> Result<Action, ManifestError> {
        let anchor = match self.anchor.as_deref() {
            Some(anchor) if !anchor.is_empty() => anchor.to_string(),
            _ => return Err(ManifestError::MissingAnchor(id.to_string())),
        };
        let position = match self.position.as_deref() {
            None => return Err(ManifestError::MissingPosition(id.to_string())),
            Some("before") => Position::Before,
            Some("after") => Position::After,
            Some(other) => {
                return Err(ManifestError::InvalidPosition {
                    id: id.to_string(),
                    position: other.to_string(),
                })
            }
        };
        let lines = match self.lines.as_ref() {
            Some(lines) if !lines.is_empty() => lines.clone(),
            _ => return Err(ManifestError::MissingLines(id.to_string())),
        };

        // Every inject body must describe its own marker boundaries, so that
        // idempotency detection and later removal work on the same tokens.
        let begin = begin_token(id);
        let end = end_token(id);
        let has_begin = lines.iter().any(|line| token_on_line(line, &begin));
        let has_end = lines.iter().any(|line| token_on_line(line, &end));
        if !has_begin || !has_end {
            return Err(ManifestError::MarkersMissing(id.to_string()));
        }

        Ok(Action::Inject {
            anchor,
            position,
            lines,
        })
    }

    fn resolve_comment(&self, id: &str) -> Result<Action, ManifestError> {
        let prefix = match self.comment_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix.to_string(),
            _ => return Err(ManifestError::MissingPrefix(id.to_string())),
        };
        let max_matches = match self.max_matches {
            Some(value) if value > 0 => value as usize,
            Some(value) => {
                return Err(ManifestError::InvalidMaxMatches {
                    id: id.to_string(),
                    value,
                })
            }
            None => {
                return Err(ManifestError::InvalidMaxMatches {
                    id: id.to_string(),
                    value: 0,
                })
            }
        };

        let target = match (
            self.identifier.as_deref(),
            self.block_start.as_deref(),
            self.block_end.as_deref(),
        ) {
            (Some(identifier), None, None) if !identifier.is_empty() => CommentTarget::Line {
                identifier: identifier.to_string(),
            },
            (None, Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => {
                CommentTarget::Block {
                    start: start.to_string(),
                    end: end.to_string(),
                }
            }
            _ => return Err(ManifestError::AmbiguousMode(id.to_string())),
        };

        Ok(Action::Comment {
            prefix,
            max_matches,
            target,
        })
    }
}
