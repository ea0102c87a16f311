//! External capabilities consumed by sessions.
//!
//! Sessions own the protocol; the domain answers come from collaborators
//! behind the traits in this module. A [`Services`] bundle is built once at
//! startup and shared by every connection.

mod compiler;
mod symbols;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lsp_types::{
    CompletionItem, CompletionParams, CompletionResponse, DocumentHighlight,
    DocumentHighlightParams, GotoDefinitionParams, GotoDefinitionResponse, ReferenceParams,
    RenameParams, WorkspaceEdit,
};
use tracing::warn;

pub use compiler::{CompilerDiagnostics, UnavailableDiagnostics, diagnostics_from_output};
pub use symbols::NoSymbols;

use crate::config::DiagnosticsConfig;
use crate::error::Result;
use crate::text::{Diagnostic, Location, Uri};

/// Symbol-level intelligence: definitions, references, renames, highlights
/// and completion.
///
/// `Ok(None)` means "nothing to report" and is answered with an empty result.
/// `Err` is answered with an internal error.
#[async_trait]
pub trait SymbolProvider: Send + Sync {
    /// Resolve the definition of the symbol under the cursor.
    async fn definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>>;

    /// Find references to the symbol under the cursor.
    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>>;

    /// Plan a rename of the symbol under the cursor.
    async fn rename(&self, params: RenameParams) -> Result<Option<WorkspaceEdit>>;

    /// Highlight occurrences of the symbol under the cursor.
    async fn document_highlight(
        &self,
        params: DocumentHighlightParams,
    ) -> Result<Option<Vec<DocumentHighlight>>>;

    /// Offer completion items at the cursor.
    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>>;

    /// Fill in the details of a completion item.
    async fn resolve_completion(&self, item: CompletionItem) -> Result<Option<CompletionItem>>;
}

/// Produces diagnostics for a rule document.
#[async_trait]
pub trait DiagnosticsProvider: Send + Sync {
    /// Compile `text` (the content of `uri`) and report its problems.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityUnavailable`](crate::Error::CapabilityUnavailable)
    /// when no backend is present, or another error if the backend fails.
    async fn diagnose(&self, uri: &Uri, text: &str) -> Result<Vec<Diagnostic>>;

    /// Whether a working backend is installed.
    fn is_available(&self) -> bool {
        true
    }
}

/// The capabilities every session delegates to.
#[derive(Clone)]
pub struct Services {
    /// Symbol-level intelligence.
    pub symbols: Arc<dyn SymbolProvider>,
    /// Rule diagnostics.
    pub diagnostics: Arc<dyn DiagnosticsProvider>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("symbols", &"<dyn SymbolProvider>")
            .field("diagnostics_available", &self.diagnostics.is_available())
            .finish()
    }
}

impl Services {
    /// Bundle explicit capability implementations.
    #[must_use]
    pub fn new(
        symbols: Arc<dyn SymbolProvider>,
        diagnostics: Arc<dyn DiagnosticsProvider>,
    ) -> Self {
        Self {
            symbols,
            diagnostics,
        }
    }

    /// Select implementations from configuration.
    ///
    /// The compiler backend is used when diagnostics are enabled and its
    /// command resolves; otherwise diagnostics report themselves unavailable.
    #[must_use]
    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        let diagnostics: Arc<dyn DiagnosticsProvider> = match (&config.compiler, config.enabled) {
            (_, false) => Arc::new(UnavailableDiagnostics::new(
                "diagnostics are disabled in the configuration",
            )),
            (None, true) => Arc::new(UnavailableDiagnostics::new("no rule compiler configured")),
            (Some(compiler), true) => match CompilerDiagnostics::new(compiler.clone()) {
                Ok(backend) => Arc::new(backend),
                Err(e) => {
                    warn!("{e}. Diagnostics will not be available");
                    Arc::new(UnavailableDiagnostics::new(e.to_string()))
                }
            },
        };

        Self::new(Arc::new(NoSymbols), diagnostics)
    }
}
