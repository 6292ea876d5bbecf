//! Pure text-transform engines for interventions.
//!
//! Every operation here takes text in and returns text (or a typed error)
//! out; nothing in this module touches the filesystem. The transaction
//! coordinator owns reading, writing, and rollback.
//!
//! Line handling deliberately avoids [`str::lines`]: text is split on `\n`
//! with an explicit trailing-newline flag so carriage returns and the
//! final-newline state survive a transform byte-for-byte. That is what makes
//! remove-after-apply reproduce the original file exactly.

pub mod comment;
pub mod inject;

pub use comment::{toggle_blocks, toggle_lines, Toggle};
pub use inject::{inject, remove_block};

/// Errors raised by the text-transform engines.
///
/// All of these are deterministic functions of the manifest and the target
/// text; retrying without changing either would fail identically, so none
/// are retried anywhere.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// No line in the target contains the inject anchor.
    #[error("anchor {0:?} not found in target")]
    AnchorNotFound(String),

    /// No line (or block start) matched a comment intervention.
    #[error("identifier {0:?} matched nothing in target")]
    IdentifierNotFound(String),

    /// More lines/blocks matched than the manifest allows.
    #[error("{found} matches exceed the allowed maximum of {limit}")]
    TooManyMatches { found: usize, limit: usize },

    /// A comment block start with no block end before end of file.
    #[error("block start {0:?} has no matching end before end of file")]
    UnterminatedBlock(String),

    /// A begin marker with no end marker before end of file. The shell
    /// ancestor of this tool silently truncated the file here; under
    /// transactional rollback an error is strictly safer.
    #[error("begin marker for id {0:?} has no matching end marker")]
    UnterminatedMarker(String),
}

/// Begin marker token for an intervention id.
pub fn begin_token(id: &str) -> String {
    format!("BEGIN:{id}")
}

/// End marker token for an intervention id.
pub fn end_token(id: &str) -> String {
    format!("END:{id}")
}

/// Whether `text` already carries the injected block for `id`.
pub fn carries_marker(text: &str, id: &str) -> bool {
    let token = begin_token(id);
    split_lines(text).0.iter().any(|line| token_on_line(line, &token))
}

/// Whether `line` carries `token` as a whole marker.
///
/// Markers normally live inside comment syntax (`# BEGIN:x`, `// BEGIN:x`,
/// ...), so the token may start anywhere on the line, but it must end at a
/// boundary: id `x` must not match another intervention's `BEGIN:xy`.
pub(crate) fn token_on_line(line: &str, token: &str) -> bool {
    line.match_indices(token).any(|(at, _)| {
        match line[at + token.len()..].chars().next() {
            None => true,
            Some(next) => !(next.is_alphanumeric() || next == '-' || next == '_'),
        }
    })
}

/// Split text into lines plus a flag for whether it ended with a newline.
pub(crate) fn split_lines(text: &str) -> (Vec<&str>, bool) {
    let trailing = text.ends_with('\n');
    let mut lines: Vec<&str> = text.split('\n').collect();
    if trailing {
        lines.pop();
    }
    (lines, trailing)
}

/// Inverse of [`split_lines`].
pub(crate) fn join_lines<S: AsRef<str>>(lines: &[S], trailing: bool) -> String {
    let mut out = lines
        .iter()
        .map(|line| line.as_ref())
        .collect::<Vec<_>>()
        .join("\n");
    if trailing {
        out.push('\n');
    }
    out
}

/// Split a line into its leading whitespace and the rest.
pub(crate) fn split_indent(line: &str) -> (&str, &str) {
    let body_start = line
        .find(|c: char| !c.is_whitespace())
        .unwrap_or(line.len());
    line.split_at(body_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_join_round_trips_trailing_newline_state() {
        for text in ["", "one", "one\n", "one\ntwo", "one\ntwo\n", "\n", "a\r\nb\r\n"] {
            let (lines, trailing) = split_lines(text);
            assert_eq!(join_lines(&lines, trailing), text);
        }
    }

    #[test]
    fn marker_tokens_derive_from_id() {
        assert_eq!(begin_token("x"), "BEGIN:x");
        assert_eq!(end_token("x"), "END:x");
    }

    #[test]
    fn carries_marker_matches_inside_comment_syntax() {
        assert!(carries_marker("code\n# BEGIN:alias\nstuff\n", "alias"));
        assert!(carries_marker("code\n// BEGIN:alias end\nstuff\n", "alias"));
        assert!(!carries_marker("code\n# BEGIN:aliases\nstuff\n", "alias-set"));
        assert!(!carries_marker("code\n", "alias"));
    }

    #[test]
    fn prefix_overlapping_ids_do_not_collide() {
        // Id `x` must not see `BEGIN:xy` as its own marker.
        let text = "code\n# BEGIN:xy\nstuff\n# END:xy\n";
        assert!(!carries_marker(text, "x"));
        assert!(carries_marker(text, "xy"));
        assert!(token_on_line("# BEGIN:x trailing words", "BEGIN:x"));
        assert!(!token_on_line("# BEGIN:x_extra", "BEGIN:x"));
        assert!(!token_on_line("# BEGIN:x-extra", "BEGIN:x"));
    }

    #[test]
    fn split_indent_handles_tabs_and_empty_lines() {
        assert_eq!(split_indent("  \tbody"), ("  \t", "body"));
        assert_eq!(split_indent("body"), ("", "body"));
        assert_eq!(split_indent("   "), ("   ", ""));
        assert_eq!(split_indent(""), ("", ""));
    }
}
