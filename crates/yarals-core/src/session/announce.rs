//! Server capability announcement.
//!
//! A text-document feature is announced only when the client declares
//! `dynamicRegistration` for it. The rule-compile command is always offered.

use lsp_types::{
    CompletionOptions, ExecuteCommandOptions, OneOf, SaveOptions, ServerCapabilities,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions,
};
use serde_json::{Value, json};

/// Command that compiles one rule file and publishes its diagnostics.
pub const COMPILE_RULE_COMMAND: &str = "yara.CompileRule";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "yarals";

/// Compute the capabilities to announce for a client.
///
/// `client_capabilities` is the `capabilities` object from the `initialize`
/// params; missing or malformed parts count as "not declared".
#[must_use]
pub fn server_capabilities(client_capabilities: Option<&Value>) -> ServerCapabilities {
    let text_document = client_capabilities.and_then(|caps| caps.get("textDocument"));
    let declares = |feature: &str| {
        text_document
            .and_then(|td| td.get(feature))
            .and_then(|f| f.get("dynamicRegistration"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };

    let mut capabilities = ServerCapabilities {
        execute_command_provider: Some(ExecuteCommandOptions {
            commands: vec![COMPILE_RULE_COMMAND.to_string()],
            ..Default::default()
        }),
        ..Default::default()
    };

    if declares("synchronization") {
        // Documents are synced by always sending the full content.
        capabilities.text_document_sync = Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(true),
                })),
                ..Default::default()
            },
        ));
    }
    if declares("completion") {
        capabilities.completion_provider = Some(CompletionOptions {
            resolve_provider: Some(true),
            trigger_characters: Some(vec![".".to_string()]),
            ..Default::default()
        });
    }
    if declares("definition") {
        capabilities.definition_provider = Some(OneOf::Left(true));
    }
    if declares("references") {
        capabilities.references_provider = Some(OneOf::Left(true));
    }
    if declares("documentHighlight") {
        capabilities.document_highlight_provider = Some(OneOf::Left(true));
    }
    if declares("rename") {
        capabilities.rename_provider = Some(OneOf::Left(true));
    }

    capabilities
}

/// Build the full `initialize` result.
///
/// # Errors
///
/// Returns an error if the capabilities cannot be serialized.
pub fn initialize_result(client_capabilities: Option<&Value>) -> serde_json::Result<Value> {
    Ok(json!({
        "capabilities": serde_json::to_value(server_capabilities(client_capabilities))?,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}
