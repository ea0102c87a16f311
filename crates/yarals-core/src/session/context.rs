//! Per-session mutable state handed to method handlers.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::state::SessionState;
use crate::capability::Services;
use crate::config::WorkspaceSettings;
use crate::error::{Error, Result};
use crate::rpc::{JsonRpcNotification, RequestId};
use crate::text::Uri;

/// Everything a handler may read or change.
///
/// Owned by exactly one connection task, so nothing here is locked.
/// Handlers queue outgoing notifications in an outbox that the session
/// flushes after the current message's response is written.
#[derive(Debug)]
pub struct SessionContext {
    state: SessionState,
    services: Services,
    settings_namespace: String,
    workspace_root: Option<PathBuf>,
    workspace_config: Map<String, Value>,
    last_request_id: Option<RequestId>,
    handshake_complete: bool,
    exit_code: Option<i32>,
    outbox: Vec<JsonRpcNotification>,
}

impl SessionContext {
    /// Create a fresh, uninitialized context.
    #[must_use]
    pub fn new(services: Services, settings_namespace: impl Into<String>) -> Self {
        Self {
            state: SessionState::Uninitialized,
            services,
            settings_namespace: settings_namespace.into(),
            workspace_root: None,
            workspace_config: Map::new(),
            last_request_id: None,
            handshake_complete: false,
            exit_code: None,
            outbox: Vec::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`.
    pub fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            warn!("unexpected session transition {} -> {}", self.state, next);
        }
        debug!("session {} -> {}", self.state, next);
        self.state = next;
    }

    /// Shared capabilities.
    #[must_use]
    pub const fn services(&self) -> &Services {
        &self.services
    }

    /// Key under `params.settings` holding this server's settings.
    #[must_use]
    pub fn settings_namespace(&self) -> &str {
        &self.settings_namespace
    }

    /// Workspace root captured at `initialize`.
    #[must_use]
    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub(crate) fn set_workspace_root(&mut self, root: Option<PathBuf>) {
        self.workspace_root = root;
    }

    /// Raw workspace configuration from the last `didChangeConfiguration`.
    #[must_use]
    pub const fn workspace_config(&self) -> &Map<String, Value> {
        &self.workspace_config
    }

    pub(crate) fn replace_workspace_config(&mut self, config: Map<String, Value>) {
        self.workspace_config = config;
    }

    /// Typed view of the workspace configuration.
    #[must_use]
    pub fn settings(&self) -> WorkspaceSettings {
        WorkspaceSettings::from_map(&self.workspace_config)
    }

    /// Id of the most recent request.
    #[must_use]
    pub const fn last_request_id(&self) -> Option<&RequestId> {
        self.last_request_id.as_ref()
    }

    pub(crate) fn record_request_id(&mut self, id: RequestId) {
        self.last_request_id = Some(id);
    }

    /// Whether the client has sent `initialized`.
    #[must_use]
    pub const fn handshake_complete(&self) -> bool {
        self.handshake_complete
    }

    pub(crate) fn complete_handshake(&mut self) {
        self.handshake_complete = true;
    }

    /// Exit code recorded by `exit`: 0 after `shutdown`, 1 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub(crate) fn record_exit(&mut self) {
        let code = i32::from(self.state != SessionState::ShutdownRequested);
        self.exit_code = Some(code);
        self.transition(SessionState::Exited);
    }

    /// Queue a notification for the client.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` cannot be serialized.
    pub fn notify<P: Serialize>(&mut self, method: &str, params: P) -> Result<()> {
        self.outbox.push(JsonRpcNotification::new(method, params)?);
        Ok(())
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<JsonRpcNotification> {
        std::mem::take(&mut self.outbox)
    }

    /// Run diagnostics for a document and queue them for publishing.
    ///
    /// Returns `Ok(false)` without publishing when no diagnostics backend is
    /// available.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn publish_diagnostics(&mut self, uri: Uri, text: &str) -> Result<bool> {
        let diagnostics = match self.services.diagnostics.diagnose(&uri, text).await {
            Ok(diagnostics) => diagnostics,
            Err(Error::CapabilityUnavailable(reason)) => {
                warn!("diagnostics unavailable for {}: {reason}", uri.as_str());
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        debug!(
            uri = %uri.as_str(),
            count = diagnostics.len(),
            "publishing diagnostics"
        );
        self.notify(
            "textDocument/publishDiagnostics",
            lsp_types::PublishDiagnosticsParams::new(uri, diagnostics, None),
        )?;
        Ok(true)
    }
}
