//! Anchored block injection and marker-bounded removal.

use super::{begin_token, end_token, join_lines, split_lines, token_on_line, PatchError};
use crate::manifest::Position;

/// Insert `block` into `text` relative to the first line containing `anchor`.
///
/// Only the first anchor occurrence is used; the block lands exactly once
/// even when the anchor recurs later in the file. Idempotency (skipping when
/// the block is already present) is the caller's job — this function always
/// inserts.
pub fn inject(
    text: &str,
    anchor: &str,
    position: Position,
    block: &[String],
) -> Result<String, PatchError> {
    let (lines, trailing) = split_lines(text);
    let hit = lines
        .iter()
        .position(|line| line.contains(anchor))
        .ok_or_else(|| PatchError::AnchorNotFound(anchor.to_string()))?;

    let at = match position {
        Position::Before => hit,
        Position::After => hit + 1,
    };

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + block.len());
    out.extend(&lines[..at]);
    out.extend(block.iter().map(String::as_str));
    out.extend(&lines[at..]);
    Ok(join_lines(&out, trailing))
}

/// Remove the marker-bounded block for `id` from `text`.
///
/// Returns `Ok(None)` when no begin marker is present — removing an
/// unapplied intervention succeeds trivially. A begin marker with no end
/// marker is an error; see [`PatchError::UnterminatedMarker`].
pub fn remove_block(text: &str, id: &str) -> Result<Option<String>, PatchError> {
    let begin = begin_token(id);
    let end = end_token(id);

    let (lines, trailing) = split_lines(text);
    let Some(start) = lines.iter().position(|line| token_on_line(line, &begin)) else {
        return Ok(None);
    };
    let stop = lines[start + 1..]
        .iter()
        .position(|line| token_on_line(line, &end))
        .map(|offset| start + 1 + offset)
        .ok_or_else(|| PatchError::UnterminatedMarker(id.to_string()))?;

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() - (stop - start + 1));
    out.extend(&lines[..start]);
    out.extend(&lines[stop + 1..]);
    Ok(Some(join_lines(&out, trailing)))
}
