//! Method table and handlers.
//!
//! Every inbound method the server understands has exactly one [`Route`]:
//! the state it requires and the function that serves it. The session
//! checks the precondition before calling the handler, so handlers never
//! look at the lifecycle state themselves.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use futures::future::BoxFuture;
use lsp_types::{
    CompletionItem, CompletionParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    DocumentHighlightParams, ExecuteCommandParams, GotoDefinitionParams, MessageType,
    ReferenceParams, RenameParams, ShowMessageParams,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, warn};

use super::announce::{COMPILE_RULE_COMMAND, initialize_result};
use super::context::SessionContext;
use super::state::{Precondition, SessionState};
use crate::error::{Error, Result};
use crate::rpc::JsonRpcError;
use crate::text::{Uri, parse_uri};

/// Future returned by a request handler.
pub type RequestFuture<'a> = BoxFuture<'a, std::result::Result<Value, JsonRpcError>>;

/// Future returned by a notification handler.
pub type NotificationFuture<'a> = BoxFuture<'a, Result<()>>;

/// Serves a request; the result or error is sent back with the request id.
pub type RequestHandler = for<'a> fn(&'a mut SessionContext, Option<Value>) -> RequestFuture<'a>;

/// Serves a notification; errors are logged only.
pub type NotificationHandler =
    for<'a> fn(&'a mut SessionContext, Option<Value>) -> NotificationFuture<'a>;

/// How a method is served.
#[derive(Clone, Copy)]
pub enum Handler {
    /// Expects an id and produces a response.
    Request(RequestHandler),
    /// Has no id and produces no response.
    Notification(NotificationHandler),
}

/// One entry of the method table.
#[derive(Clone, Copy)]
pub struct Route {
    /// State the session must be in for the handler to run.
    pub precondition: Precondition,
    /// The handler itself.
    pub handler: Handler,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.handler {
            Handler::Request(_) => "request",
            Handler::Notification(_) => "notification",
        };
        f.debug_struct("Route")
            .field("precondition", &self.precondition)
            .field("kind", &kind)
            .finish()
    }
}

/// Method-name-keyed handler table.
#[derive(Debug, Default)]
pub struct MethodTable {
    routes: HashMap<&'static str, Route>,
}

static STANDARD: LazyLock<MethodTable> = LazyLock::new(MethodTable::build_standard);

impl MethodTable {
    /// The table every session uses.
    #[must_use]
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    /// Look up the route for `method`.
    #[must_use]
    pub fn route(&self, method: &str) -> Option<&Route> {
        self.routes.get(method)
    }

    /// Number of routed methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn build_standard() -> Self {
        use Precondition::{Any, Initialized, Uninitialized};

        Self::default()
            .request("initialize", Uninitialized, initialize)
            .request("shutdown", Initialized, shutdown)
            .request("textDocument/definition", Initialized, definition)
            .request("textDocument/references", Initialized, references)
            .request("textDocument/rename", Initialized, rename)
            .request("textDocument/documentHighlight", Initialized, document_highlight)
            .request("textDocument/completion", Initialized, completion)
            .request("completionItem/resolve", Initialized, resolve_completion)
            .request("workspace/executeCommand", Initialized, execute_command)
            .notification("initialized", Initialized, initialized)
            .notification("exit", Any, exit)
            .notification("workspace/didChangeConfiguration", Initialized, did_change_configuration)
            .notification("textDocument/didOpen", Initialized, did_open)
            .notification("textDocument/didSave", Initialized, did_save)
    }

    fn request(
        mut self,
        method: &'static str,
        precondition: Precondition,
        handler: RequestHandler,
    ) -> Self {
        self.routes.insert(
            method,
            Route {
                precondition,
                handler: Handler::Request(handler),
            },
        );
        self
    }

    fn notification(
        mut self,
        method: &'static str,
        precondition: Precondition,
        handler: NotificationHandler,
    ) -> Self {
        self.routes.insert(
            method,
            Route {
                precondition,
                handler: Handler::Notification(handler),
            },
        );
        self
    }
}

fn decode<P: DeserializeOwned>(params: Option<Value>) -> std::result::Result<P, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(format!("invalid params: {e}")))
}

/// Turn a capability answer into a response result.
///
/// No result is answered with `{}`. An unavailable capability degrades to the
/// same empty result with a warning; any other failure is an internal error.
fn respond<T: Serialize>(result: Result<Option<T>>) -> std::result::Result<Value, JsonRpcError> {
    match result {
        Ok(Some(value)) => {
            serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
        }
        Ok(None) => Ok(json!({})),
        Err(Error::CapabilityUnavailable(reason)) => {
            warn!("capability unavailable: {reason}");
            Ok(json!({}))
        }
        Err(e) => {
            error!("capability failed: {e}");
            Err(JsonRpcError::internal(e.to_string()))
        }
    }
}

fn initialize(ctx: &mut SessionContext, params: Option<Value>) -> RequestFuture<'_> {
    Box::pin(async move {
        let params = params.unwrap_or(Value::Null);

        let root = match params.get("rootUri").and_then(Value::as_str) {
            Some(uri) => Some(
                parse_uri(uri).map_err(|e| JsonRpcError::invalid_params(e.to_string()))?,
            ),
            None => params
                .get("rootPath")
                .and_then(Value::as_str)
                .map(PathBuf::from),
        };

        let result = initialize_result(params.get("capabilities"))
            .map_err(|e| JsonRpcError::internal(e.to_string()))?;

        match &root {
            Some(root) => info!("client workspace folder: {}", root.display()),
            None => info!("client opened no workspace folder"),
        }
        ctx.set_workspace_root(root);
        ctx.transition(SessionState::Initialized);

        Ok(result)
    })
}

fn shutdown(ctx: &mut SessionContext, _params: Option<Value>) -> RequestFuture<'_> {
    Box::pin(async move {
        info!("client requested shutdown");
        ctx.transition(SessionState::ShutdownRequested);
        Ok(json!({}))
    })
}

fn definition(ctx: &mut SessionContext, params: Option<Value>) -> RequestFuture<'_> {
    Box::pin(async move {
        let params: GotoDefinitionParams = decode(params)?;
        let symbols = Arc::clone(&ctx.services().symbols);
        respond(symbols.definition(params).await)
    })
}

fn references(ctx: &mut SessionContext, params: Option<Value>) -> RequestFuture<'_> {
    Box::pin(async move {
        let params: ReferenceParams = decode(params)?;
        let symbols = Arc::clone(&ctx.services().symbols);
        respond(symbols.references(params).await)
    })
}

fn rename(ctx: &mut SessionContext, params: Option<Value>) -> RequestFuture<'_> {
    Box::pin(async move {
        let params: RenameParams = decode(params)?;
        let symbols = Arc::clone(&ctx.services().symbols);
        respond(symbols.rename(params).await)
    })
}

fn document_highlight(ctx: &mut SessionContext, params: Option<Value>) -> RequestFuture<'_> {
    Box::pin(async move {
        let params: DocumentHighlightParams = decode(params)?;
        let symbols = Arc::clone(&ctx.services().symbols);
        respond(symbols.document_highlight(params).await)
    })
}

fn completion(ctx: &mut SessionContext, params: Option<Value>) -> RequestFuture<'_> {
    Box::pin(async move {
        let params: CompletionParams = decode(params)?;
        let symbols = Arc::clone(&ctx.services().symbols);
        respond(symbols.completion(params).await)
    })
}

fn resolve_completion(ctx: &mut SessionContext, params: Option<Value>) -> RequestFuture<'_> {
    Box::pin(async move {
        let item: CompletionItem = decode(params)?;
        let symbols = Arc::clone(&ctx.services().symbols);
        respond(symbols.resolve_completion(item).await)
    })
}

fn execute_command(ctx: &mut SessionContext, params: Option<Value>) -> RequestFuture<'_> {
    Box::pin(async move {
        let params: ExecuteCommandParams = decode(params)?;
        if params.command != COMPILE_RULE_COMMAND {
            return Err(JsonRpcError::invalid_params(format!(
                "unknown command: {}",
                params.command
            )));
        }

        let uri = params
            .arguments
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| {
                JsonRpcError::invalid_params(format!(
                    "{COMPILE_RULE_COMMAND} expects a document URI argument"
                ))
            })?;
        let path = parse_uri(uri).map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;
        let uri = Uri::from_str(uri)
            .map_err(|e| JsonRpcError::invalid_params(format!("invalid URI: {e}")))?;

        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            JsonRpcError::internal(format!("failed to read {}: {e}", path.display()))
        })?;

        info!("compiling {}", path.display());
        ctx.publish_diagnostics(uri, &text)
            .await
            .map_err(|e| JsonRpcError::internal(e.to_string()))?;

        Ok(json!({}))
    })
}

fn initialized(ctx: &mut SessionContext, _params: Option<Value>) -> NotificationFuture<'_> {
    Box::pin(async move {
        info!("client has been successfully initialized");
        ctx.complete_handshake();
        ctx.notify(
            "window/showMessage",
            ShowMessageParams {
                typ: MessageType::INFO,
                message: "Successfully connected".to_string(),
            },
        )
    })
}

fn exit(ctx: &mut SessionContext, _params: Option<Value>) -> NotificationFuture<'_> {
    Box::pin(async move {
        ctx.record_exit();
        match ctx.exit_code() {
            Some(0) => info!("client requested exit"),
            _ => warn!("client requested exit without shutdown"),
        }
        Ok(())
    })
}

fn did_change_configuration(
    ctx: &mut SessionContext,
    params: Option<Value>,
) -> NotificationFuture<'_> {
    Box::pin(async move {
        let config = params
            .as_ref()
            .and_then(|p| p.get("settings"))
            .and_then(|s| s.get(ctx.settings_namespace()))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new);

        let shown = Value::Object(config.clone());
        debug!("changed workspace config to {shown}");
        ctx.replace_workspace_config(config);

        if ctx.settings().tracing_requested() {
            info!("ignoring trace request for now");
        }
        Ok(())
    })
}

fn did_open(ctx: &mut SessionContext, params: Option<Value>) -> NotificationFuture<'_> {
    Box::pin(async move {
        let params: DidOpenTextDocumentParams =
            serde_json::from_value(params.unwrap_or(Value::Null))?;
        let document = params.text_document;
        debug!(uri = %document.uri.as_str(), "document opened");
        ctx.publish_diagnostics(document.uri, &document.text).await?;
        Ok(())
    })
}

fn did_save(ctx: &mut SessionContext, params: Option<Value>) -> NotificationFuture<'_> {
    Box::pin(async move {
        let params: DidSaveTextDocumentParams =
            serde_json::from_value(params.unwrap_or(Value::Null))?;
        let uri = params.text_document.uri;

        if !ctx.settings().compile_on_save {
            debug!(uri = %uri.as_str(), "compileOnSave is off; not recompiling");
            return Ok(());
        }

        let text = match params.text {
            Some(text) => text,
            None => tokio::fs::read_to_string(parse_uri(uri.as_str())?).await?,
        };
        ctx.publish_diagnostics(uri, &text).await?;
        Ok(())
    })
}
