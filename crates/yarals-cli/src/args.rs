//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// YARA language server
///
/// Serves rule-file intelligence (diagnostics, definitions, completion)
/// to editors over a TCP connection.
#[derive(Debug, Parser)]
#[command(name = "yarals")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, searches for yarals.toml in:
    /// 1. $YARALS_CONFIG environment variable
    /// 2. Current directory
    /// 3. ~/.config/yarals/yarals.toml
    #[arg(short, long, value_name = "FILE", env = "YARALS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration file
    #[arg(long, value_name = "HOST", env = "YARALS_HOST")]
    pub host: Option<String>,

    /// Port to listen on, overriding the configuration file
    #[arg(short, long, value_name = "PORT", env = "YARALS_PORT")]
    pub port: Option<u16>,

    /// Logging level
    ///
    /// Valid values: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info", env = "YARALS_LOG")]
    pub log_level: String,

    /// Output logs as JSON (for structured logging)
    #[arg(long, default_value = "false", env = "YARALS_LOG_JSON")]
    pub log_json: bool,
}
