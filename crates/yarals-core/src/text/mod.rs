//! Rule document text: value types and line-oriented scanning.

pub mod model;
pub mod scanner;

pub use model::{
    DIAGNOSTIC_SOURCE, Diagnostic, DiagnosticSeverity, Location, Position, Range, Uri, diagnostic,
    line_range,
};
pub use scanner::{
    is_rule_end, is_rule_header, parse_compiler_result, parse_uri, rule_range_at, split_lines,
};
