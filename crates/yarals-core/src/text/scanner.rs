//! Line-oriented scanning of rule documents.
//!
//! Nothing here parses the rule language. Rule blocks are located by their
//! header and closing-brace lines, and compiler output is split on its first
//! colon. Rule bodies are assumed not to nest and each rule is assumed to end
//! with a line holding only `}`; anything else resolves to `None`.

use std::path::PathBuf;

use url::Url;

use crate::error::{Error, Result};
use crate::text::model::{Position, Range};

const RULE_KEYWORD: &str = "rule";
const RULE_MODIFIERS: [&str; 2] = ["private ", "global "];
const RULE_END: &str = "}";

/// Split a document into lines.
///
/// `\r\n`, `\r` and `\n` all end a line; `\r\n` counts once. A trailing
/// terminator yields a final empty line, so line indexes match what an
/// editor shows.
#[must_use]
pub fn split_lines(document: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let bytes = document.as_bytes();
    let mut start = 0;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'\n' => {
                lines.push(&document[start..index]);
                index += 1;
                start = index;
            }
            b'\r' => {
                lines.push(&document[start..index]);
                index += if bytes.get(index + 1) == Some(&b'\n') { 2 } else { 1 };
                start = index;
            }
            _ => index += 1,
        }
    }
    lines.push(&document[start..]);
    lines
}

/// Whether `line` opens a rule: `rule`, `private rule` or `global rule`
/// at column 0, followed by a word boundary.
#[must_use]
pub fn is_rule_header(line: &str) -> bool {
    let rest = RULE_MODIFIERS
        .iter()
        .find_map(|modifier| line.strip_prefix(modifier))
        .unwrap_or(line);

    rest.strip_prefix(RULE_KEYWORD).is_some_and(|tail| {
        tail.chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
    })
}

/// Whether `line` closes a rule: exactly `}` with nothing around it.
#[must_use]
pub fn is_rule_end(line: &str) -> bool {
    line == RULE_END
}

/// Find the rule block enclosing `cursor`.
///
/// The range starts at column 0 of the nearest rule header at or above the
/// cursor line and ends at column 0 of the line after the nearest closing
/// brace at or below it. Returns `None` when either end is missing, when a
/// closing brace sits between the header and the cursor, or when another
/// header sits between the cursor and the closing brace.
#[must_use]
pub fn rule_range_at(document: &str, cursor: Position) -> Option<Range> {
    let lines = split_lines(document);
    let cursor_line = usize::try_from(cursor.line).ok()?;
    if cursor_line >= lines.len() {
        return None;
    }

    let mut start = None;
    for index in (0..=cursor_line).rev() {
        let line = lines[index];
        if is_rule_header(line) {
            start = Some(index);
            break;
        }
        if index < cursor_line && is_rule_end(line) {
            return None;
        }
    }
    let start = start?;

    let mut end = None;
    for (index, line) in lines.iter().enumerate().skip(cursor_line) {
        if is_rule_end(line) {
            end = Some(index + 1);
            break;
        }
        if index > cursor_line && is_rule_header(line) {
            return None;
        }
    }
    let end = end?;

    Some(Range::new(
        Position::new(u32::try_from(start).ok()?, 0),
        Position::new(u32::try_from(end).ok()?, 0),
    ))
}

/// Parse one compiler result of the form `line <N>: <message>`.
///
/// Only the first colon separates the prefix, so messages may contain
/// colons of their own. The message is trimmed.
///
/// # Errors
///
/// Returns [`Error::ResultParse`] when there is no colon, when the prefix is
/// not `line` followed by an integer, or when the message is empty.
pub fn parse_compiler_result(result: &str) -> Result<(u32, String)> {
    let (meta, message) = result
        .split_once(':')
        .ok_or_else(|| Error::ResultParse(format!("missing ':' in {result:?}")))?;

    let mut tokens = meta.split_whitespace();
    let line_number = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some("line"), Some(number), None) => number.parse::<u32>().map_err(|e| {
            Error::ResultParse(format!("invalid line number {number:?}: {e}"))
        })?,
        _ => {
            return Err(Error::ResultParse(format!(
                "expected \"line <N>\" before ':' in {result:?}"
            )));
        }
    };

    let message = message.trim();
    if message.is_empty() {
        return Err(Error::ResultParse(format!("empty message in {result:?}")));
    }

    Ok((line_number, message.to_string()))
}

/// Turn a `file:` URI into a filesystem path, percent-decoding it.
///
/// # Errors
///
/// Returns [`Error::InvalidUri`] for unparseable URIs, other schemes, or
/// URIs with no local path form.
pub fn parse_uri(uri: &str) -> Result<PathBuf> {
    let url = Url::parse(uri).map_err(|e| Error::InvalidUri(format!("{uri}: {e}")))?;
    if url.scheme() != "file" {
        return Err(Error::InvalidUri(format!(
            "{uri}: unsupported scheme '{}'",
            url.scheme()
        )));
    }
    url.to_file_path()
        .map_err(|()| Error::InvalidUri(format!("{uri}: not a local file path")))
}
