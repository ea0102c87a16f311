//! Symbol provider used when no semantic backend is installed.

use async_trait::async_trait;
use lsp_types::{
    CompletionItem, CompletionParams, CompletionResponse, DocumentHighlight,
    DocumentHighlightParams, GotoDefinitionParams, GotoDefinitionResponse, ReferenceParams,
    RenameParams, WorkspaceEdit,
};
use tracing::debug;

use super::SymbolProvider;
use crate::error::Result;
use crate::text::Location;

/// Answers every symbol query with "no result".
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

#[async_trait]
impl SymbolProvider for NoSymbols {
    async fn definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        debug!(
            uri = %params.text_document_position_params.text_document.uri.as_str(),
            "no definition resolver installed"
        );
        Ok(None)
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        debug!(
            uri = %params.text_document_position.text_document.uri.as_str(),
            "no reference finder installed"
        );
        Ok(None)
    }

    async fn rename(&self, params: RenameParams) -> Result<Option<WorkspaceEdit>> {
        debug!(new_name = %params.new_name, "no rename planner installed");
        Ok(None)
    }

    async fn document_highlight(
        &self,
        _params: DocumentHighlightParams,
    ) -> Result<Option<Vec<DocumentHighlight>>> {
        debug!("no highlight provider installed");
        Ok(None)
    }

    async fn completion(&self, _params: CompletionParams) -> Result<Option<CompletionResponse>> {
        debug!("no completion provider installed");
        Ok(None)
    }

    async fn resolve_completion(&self, item: CompletionItem) -> Result<Option<CompletionItem>> {
        debug!(label = %item.label, "no completion resolver installed");
        Ok(None)
    }
}
