//! Diagnostics backed by an external rule compiler.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::{debug, trace};

use super::DiagnosticsProvider;
use crate::config::CompilerConfig;
use crate::error::{Error, Result};
use crate::text::{
    Diagnostic, DiagnosticSeverity, Location, Position, Uri, diagnostic, line_range,
    parse_compiler_result, parse_uri, rule_range_at,
};

const INPUT_FILE_NAME: &str = "document.yar";
const OUTPUT_FILE_NAME: &str = "document.yarc";

/// Runs a rule compiler over a scratch copy of the document and turns its
/// output into diagnostics.
#[derive(Debug, Clone)]
pub struct CompilerDiagnostics {
    config: CompilerConfig,
    program: PathBuf,
}

impl CompilerDiagnostics {
    /// Create the backend, resolving the compiler command up front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityUnavailable`] if the command cannot be found.
    pub fn new(config: CompilerConfig) -> Result<Self> {
        let program = config.resolve_command().ok_or_else(|| {
            Error::CapabilityUnavailable(format!("rule compiler '{}' not found", config.command))
        })?;
        debug!("using rule compiler at {}", program.display());
        Ok(Self { config, program })
    }
}

#[async_trait]
impl DiagnosticsProvider for CompilerDiagnostics {
    async fn diagnose(&self, uri: &Uri, text: &str) -> Result<Vec<Diagnostic>> {
        let scratch = tempfile::Builder::new().prefix("yarals-").tempdir()?;
        let input = scratch.path().join(INPUT_FILE_NAME);
        let output = scratch.path().join(OUTPUT_FILE_NAME);
        tokio::fs::write(&input, text).await?;

        let mut command = Command::new(&self.program);
        command
            .args(self.config.render_args(&input, &output))
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = parse_uri(uri.as_str())
            .ok()
            .and_then(|path| path.parent().map(PathBuf::from))
            .filter(|dir| dir.is_dir())
        {
            command.current_dir(dir);
        }

        let seconds = self.config.timeout_seconds;
        let result = timeout(Duration::from_secs(seconds), command.output())
            .await
            .map_err(|_| Error::Timeout(seconds))?
            .map_err(|source| Error::CompilerSpawnFailed {
                command: self.config.command.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&result.stderr).into_owned();
        combined.push('\n');
        combined.push_str(&String::from_utf8_lossy(&result.stdout));

        debug!(
            uri = %uri.as_str(),
            status = %result.status,
            "rule compiler finished"
        );

        Ok(diagnostics_from_output(uri, text, &combined))
    }
}

/// Diagnostics backend for when no compiler is present.
#[derive(Debug, Clone)]
pub struct UnavailableDiagnostics {
    reason: String,
}

impl UnavailableDiagnostics {
    /// Create a stub that reports `reason` on every call.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl DiagnosticsProvider for UnavailableDiagnostics {
    async fn diagnose(&self, _uri: &Uri, _text: &str) -> Result<Vec<Diagnostic>> {
        Err(Error::CapabilityUnavailable(self.reason.clone()))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Convert compiler output into diagnostics for `uri`.
///
/// Each line is read either as `line <N>: <message>` or in `yarac` form,
/// `<file>(<N>): error: <message>` / `... warning: ...`. Line numbers are
/// 1-based. A diagnostic spans the rule block enclosing the reported line,
/// or just that line when it is not inside a rule. Other lines are skipped.
#[must_use]
pub fn diagnostics_from_output(uri: &Uri, text: &str, output: &str) -> Vec<Diagnostic> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parsed = parse_compiler_line(line);
            if parsed.is_none() {
                trace!("skipping compiler output line: {line}");
            }
            parsed
        })
        .filter_map(|(line_number, severity, message)| {
            let line = line_number.saturating_sub(1);
            let reported = line_range(line);
            let range = rule_range_at(text, Position::new(line, 0)).unwrap_or(reported);
            let related = vec![(
                Location::new(uri.clone(), reported),
                format!("reported at line {line_number}"),
            )];
            diagnostic(range, severity, None, &message, related)
        })
        .collect()
}

fn parse_compiler_line(line: &str) -> Option<(u32, DiagnosticSeverity, String)> {
    if let Ok((number, message)) = parse_compiler_result(line) {
        return Some((number, DiagnosticSeverity::ERROR, message));
    }
    parse_yarac_line(line)
}

fn parse_yarac_line(line: &str) -> Option<(u32, DiagnosticSeverity, String)> {
    const MARKERS: [(&str, DiagnosticSeverity); 2] = [
        ("): error: ", DiagnosticSeverity::ERROR),
        ("): warning: ", DiagnosticSeverity::WARNING),
    ];

    MARKERS.iter().find_map(|(marker, severity)| {
        let at = line.find(marker)?;
        let head = &line[..at];
        let number = head[head.rfind('(')? + 1..].parse::<u32>().ok()?;
        let message = line[at + marker.len()..].trim();
        (!message.is_empty()).then(|| (number, *severity, message.to_string()))
    })
}
