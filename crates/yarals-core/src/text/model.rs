//! Document value types.
//!
//! Positions, ranges, locations and diagnostics are the standard LSP shapes
//! from `lsp_types`, re-exported here so the rest of the crate names them in
//! one place. Cursor columns are always called `character`.

pub use lsp_types::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location, NumberOrString,
    Position, Range, Uri,
};

/// `source` stamped on every diagnostic this server produces.
pub const DIAGNOSTIC_SOURCE: &str = "yara-lang";

/// Range covering one whole line, from its first column to the start of the next line.
#[must_use]
pub const fn line_range(line: u32) -> Range {
    Range {
        start: Position { line, character: 0 },
        end: Position {
            line: line.saturating_add(1),
            character: 0,
        },
    }
}

/// Build a diagnostic with this server's source tag.
///
/// Returns `None` for a blank message; a diagnostic must say something.
#[must_use]
pub fn diagnostic(
    range: Range,
    severity: DiagnosticSeverity,
    code: Option<NumberOrString>,
    message: &str,
    related: Vec<(Location, String)>,
) -> Option<Diagnostic> {
    let message = message.trim();
    if message.is_empty() {
        return None;
    }

    let related_information = related
        .into_iter()
        .map(|(location, message)| DiagnosticRelatedInformation { location, message })
        .collect();

    Some(Diagnostic {
        range,
        severity: Some(severity),
        code,
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: message.to_string(),
        related_information: Some(related_information),
        ..Default::default()
    })
}
