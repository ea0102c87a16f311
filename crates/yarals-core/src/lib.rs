//! # yarals-core
//!
//! Core library for a YARA rule language server speaking JSON-RPC over TCP.
//!
//! Each accepted connection gets its own session that walks the protocol
//! lifecycle and answers editor requests, delegating rule intelligence to
//! pluggable capabilities.
//!
//! ## Architecture
//!
//! - [`rpc`] - header-delimited framing and JSON-RPC envelope types
//! - [`session`] - per-connection state machine and method table
//! - [`text`] - position model and line-oriented rule text scanning
//! - [`capability`] - symbol and diagnostics providers
//! - [`listener`] - TCP accept loop and live-connection accounting
//! - [`config`] - configuration types and loading
//! - [`error`] - error types for the library
//!
//! ## Example
//!
//! ```rust,ignore
//! use yarals_core::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), yarals_core::Error> {
//!     let config = ServerConfig::load()?;
//!     serve(config).await
//! }
//! ```

pub mod capability;
pub mod config;
pub mod error;
pub mod listener;
pub mod rpc;
pub mod session;
pub mod text;

use std::future::Future;

pub use capability::Services;
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use listener::{ConnectionRegistry, Listener};
pub use session::{Session, SessionEnd, SessionState};

/// Serve clients on the configured endpoint until the process ends.
///
/// # Errors
///
/// Returns an error if the endpoint cannot be bound or accepting fails.
pub async fn serve(config: ServerConfig) -> Result<()> {
    serve_until(config, std::future::pending()).await
}

/// Serve clients until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if the endpoint cannot be bound or accepting fails.
pub async fn serve_until<F>(config: ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tracing::info!("Starting YARA language server...");

    let services = Services::from_config(&config.diagnostics);
    let listener = Listener::bind(&config, services).await?;
    listener.run_until(shutdown).await?;

    tracing::info!("YARA language server shutting down");
    Ok(())
}
