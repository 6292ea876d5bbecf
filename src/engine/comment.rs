//! Comment toggling for single lines and delimited blocks.
//!
//! Both modes share one per-line rule: apply inserts the comment prefix
//! immediately after the line's leading whitespace unless it is already the
//! first non-whitespace content; remove strips it from the same spot if
//! present. The per-line rule is what makes a toggle idempotent.

use super::{join_lines, split_indent, split_lines, PatchError};

/// Direction of a comment toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Apply,
    Remove,
}

/// Matched positions for a comment intervention.
///
/// `units` is what counts against `max_matches`: lines in line mode, blocks
/// in block mode. `line_indices` is every individual line the toggle will
/// rewrite.
pub(crate) struct Matches {
    pub(crate) units: usize,
    pub(crate) line_indices: Vec<usize>,
}

/// Toggle every line containing `identifier`.
pub fn toggle_lines(
    text: &str,
    identifier: &str,
    prefix: &str,
    max_matches: usize,
    toggle: Toggle,
) -> Result<String, PatchError> {
    let (lines, trailing) = split_lines(text);
    let matches = match_lines(&lines, identifier)?;
    check_budget(&matches, max_matches)?;
    Ok(join_lines(&rewrite(&lines, &matches, prefix, toggle), trailing))
}

/// Toggle every line of every `start..=end` delimited block.
pub fn toggle_blocks(
    text: &str,
    start: &str,
    end: &str,
    prefix: &str,
    max_matches: usize,
    toggle: Toggle,
) -> Result<String, PatchError> {
    let (lines, trailing) = split_lines(text);
    let matches = match_blocks(&lines, start, end)?;
    check_budget(&matches, max_matches)?;
    Ok(join_lines(&rewrite(&lines, &matches, prefix, toggle), trailing))
}

pub(crate) fn match_lines(lines: &[&str], identifier: &str) -> Result<Matches, PatchError> {
    let line_indices: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(identifier))
        .map(|(index, _)| index)
        .collect();
    if line_indices.is_empty() {
        return Err(PatchError::IdentifierNotFound(identifier.to_string()));
    }
    Ok(Matches {
        units: line_indices.len(),
        line_indices,
    })
}

pub(crate) fn match_blocks(lines: &[&str], start: &str, end: &str) -> Result<Matches, PatchError> {
    let mut units = 0;
    let mut line_indices = Vec::new();
    let mut cursor = 0;
    while cursor < lines.len() {
        if !lines[cursor].contains(start) {
            cursor += 1;
            continue;
        }
        let stop = lines[cursor + 1..]
            .iter()
            .position(|line| line.contains(end))
            .map(|offset| cursor + 1 + offset)
            .ok_or_else(|| PatchError::UnterminatedBlock(start.to_string()))?;
        units += 1;
        line_indices.extend(cursor..=stop);
        cursor = stop + 1;
    }
    if units == 0 {
        return Err(PatchError::IdentifierNotFound(start.to_string()));
    }
    Ok(Matches {
        units,
        line_indices,
    })
}

pub(crate) fn check_budget(matches: &Matches, max_matches: usize) -> Result<(), PatchError> {
    if matches.units > max_matches {
        return Err(PatchError::TooManyMatches {
            found: matches.units,
            limit: max_matches,
        });
    }
    Ok(())
}

/// Whether a single line already carries the comment prefix.
pub(crate) fn is_prefixed(line: &str, prefix: &str) -> bool {
    split_indent(line).1.starts_with(prefix)
}

fn rewrite(lines: &[&str], matches: &Matches, prefix: &str, toggle: Toggle) -> Vec<String> {
    let mut out: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
    for &index in &matches.line_indices {
        out[index] = toggle_line(&out[index], prefix, toggle);
    }
    out
}

fn toggle_line(line: &str, prefix: &str, toggle: Toggle) -> String {
    let (indent, body) = split_indent(line);
    match toggle {
        Toggle::Apply if body.starts_with(prefix) => line.to_string(),
        Toggle::Apply => format!("{indent}{prefix}{body}"),
        Toggle::Remove => match body.strip_prefix(prefix) {
            Some(rest) => format!("{indent}{rest}"),
            None => line.to_string(),
        },
    }
}
