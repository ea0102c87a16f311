//! Configuration types and loading.
//!
//! This module provides configuration structures for the YARA language
//! server: the listening endpoint, the namespace read from client settings,
//! and the diagnostics backend.

mod compiler;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use compiler::{CompilerConfig, INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER};

use crate::error::{Error, Result};

/// Default listening host. Editor extensions connect here without negotiation.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listening port. Editor extensions configure this statically.
pub const DEFAULT_PORT: u16 = 8471;

/// Default key read from `workspace/didChangeConfiguration` settings.
pub const DEFAULT_SETTINGS_NAMESPACE: &str = "yara";

/// Main configuration for the language server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listening endpoint.
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Key under `params.settings` holding this server's workspace settings.
    #[serde(default = "default_settings_namespace")]
    pub settings_namespace: String,

    /// Diagnostics backend.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Host and port the listener binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerConfig {
    /// Host or IP address.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ListenerConfig {
    /// The `host:port` string handed to the socket layer.
    #[must_use]
    pub fn address(&self) -> String {
        // Bare IPv6 literals need brackets.
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Parse the endpoint as a socket address when the host is an IP literal.
    #[must_use]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.address().parse().ok()
    }
}

/// Diagnostics backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Turn compiler diagnostics on or off.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Compiler used to produce diagnostics. `None` disables diagnostics.
    #[serde(default = "default_compiler")]
    pub compiler: Option<CompilerConfig>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            compiler: default_compiler(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_settings_namespace() -> String {
    DEFAULT_SETTINGS_NAMESPACE.to_string()
}

const fn default_enabled() -> bool {
    true
}

#[allow(clippy::unnecessary_wraps)]
fn default_compiler() -> Option<CompilerConfig> {
    Some(CompilerConfig::yarac())
}

impl ServerConfig {
    /// Load configuration from the default path.
    ///
    /// Default paths checked in order:
    /// 1. `$YARALS_CONFIG` environment variable
    /// 2. `./yarals.toml` (current directory)
    /// 3. `~/.config/yarals/yarals.toml` (Linux/macOS)
    /// 4. `%APPDATA%\yarals\yarals.toml` (Windows)
    ///
    /// Falls back to built-in defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing config file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("YARALS_CONFIG") {
            return Self::load_from(Path::new(&path));
        }

        let local_config = PathBuf::from("yarals.toml");
        if local_config.exists() {
            return Self::load_from(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("yarals").join("yarals.toml");
            if user_config.exists() {
                return Self::load_from(&user_config);
            }
        }

        tracing::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist or parsing fails.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ConfigNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.listener.host.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "listener host cannot be empty".to_string(),
            ));
        }
        if self.listener.port == 0 {
            return Err(Error::InvalidConfig(
                "listener port must be non-zero".to_string(),
            ));
        }
        if self.settings_namespace.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "settings_namespace cannot be empty".to_string(),
            ));
        }
        if let Some(compiler) = &self.diagnostics.compiler {
            if compiler.command.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "compiler command cannot be empty".to_string(),
                ));
            }
            if compiler.timeout_seconds == 0 {
                return Err(Error::InvalidConfig(format!(
                    "timeout_seconds must be positive for compiler '{}'",
                    compiler.command
                )));
            }
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            settings_namespace: default_settings_namespace(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

/// Typed view of the per-workspace settings a client pushes with
/// `workspace/didChangeConfiguration`.
///
/// Unknown keys are kept in the raw map held by the session; this view only
/// reads the ones the server acts on, tolerating missing or mistyped values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSettings {
    /// Recompile a document whenever it is saved.
    pub compile_on_save: bool,
    /// Value of `trace.server` (`off`, `messages` or `verbose`).
    pub trace_server: Option<String>,
}

impl WorkspaceSettings {
    /// Read settings from the raw configuration mapping.
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let compile_on_save = map
            .get("compileOnSave")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let trace_server = map
            .get("trace")
            .and_then(|trace| trace.get("server"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            compile_on_save,
            trace_server,
        }
    }

    /// Whether the client asked for server-side tracing.
    #[must_use]
    pub fn tracing_requested(&self) -> bool {
        self.trace_server
            .as_deref()
            .is_some_and(|level| level != "off")
    }
}
