//! Rule compiler backend configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the path of the rule file being compiled.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Placeholder replaced by a scratch path for compiled output.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Configuration for the external rule compiler used to produce diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Compiler executable, either a bare name looked up on `PATH` or a path.
    pub command: String,

    /// Arguments, with `{input}` and `{output}` placeholders.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Extra environment variables for the compiler process.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Upper bound on a single compiler run, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_args() -> Vec<String> {
    vec![
        INPUT_PLACEHOLDER.to_string(),
        OUTPUT_PLACEHOLDER.to_string(),
    ]
}

const fn default_timeout() -> u64 {
    30
}

impl CompilerConfig {
    /// Create a default configuration for the stock `yarac` compiler.
    #[must_use]
    pub fn yarac() -> Self {
        Self {
            command: "yarac".to_string(),
            args: default_args(),
            env: HashMap::new(),
            timeout_seconds: default_timeout(),
        }
    }

    /// Expand the argument template for one compiler run.
    #[must_use]
    pub fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }

    /// Resolve the command to an executable path.
    ///
    /// Commands containing a path separator are checked as given; bare names
    /// are searched for in `PATH`.
    #[must_use]
    pub fn resolve_command(&self) -> Option<PathBuf> {
        let command = Path::new(&self.command);
        if command.components().count() > 1 {
            return command.is_file().then(|| command.to_path_buf());
        }

        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths).find_map(|dir| {
            let candidate = dir.join(command);
            if candidate.is_file() {
                return Some(candidate);
            }
            if cfg!(windows) {
                let exe = candidate.with_extension("exe");
                if exe.is_file() {
                    return Some(exe);
                }
            }
            None
        })
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::yarac()
    }
}
