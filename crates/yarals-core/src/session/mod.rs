//! Per-connection protocol session.
//!
//! A [`Session`] owns one framed stream and processes its messages strictly
//! in order: a message's response (and any notifications it queued) is fully
//! written before the next message is read.

pub mod announce;
mod context;
pub mod handlers;
pub mod state;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

pub use announce::{COMPILE_RULE_COMMAND, SERVER_NAME, initialize_result, server_capabilities};
pub use context::SessionContext;
pub use handlers::{Handler, MethodTable, Route};
pub use state::{Precondition, SessionState};

use crate::capability::Services;
use crate::error::Result;
use crate::rpc::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Message, MessageTransport,
};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent `exit`. `code` is 0 after `shutdown`, 1 otherwise.
    Exited {
        /// Exit code the session recorded.
        code: i32,
    },
    /// The stream ended without `exit`.
    Disconnected,
}

/// One client's protocol lifecycle over a framed stream.
#[derive(Debug)]
pub struct Session<R, W> {
    transport: MessageTransport<R, W>,
    context: SessionContext,
    methods: &'static MethodTable,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a session in the `Uninitialized` state.
    #[must_use]
    pub fn new(
        transport: MessageTransport<R, W>,
        services: Services,
        settings_namespace: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            context: SessionContext::new(services, settings_namespace),
            methods: MethodTable::standard(),
        }
    }

    /// Session context, for inspection.
    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Serve messages until `exit` or end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error on a framing failure or when the stream breaks. The
    /// session is over in either case; the caller only has to drop it.
    pub async fn run(&mut self) -> Result<SessionEnd> {
        loop {
            let message = match self.transport.read_message().await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    info!("client has closed the connection");
                    self.context.transition(SessionState::Exited);
                    return Ok(SessionEnd::Disconnected);
                }
                Err(e) => {
                    self.context.transition(SessionState::Exited);
                    return Err(e);
                }
            };

            self.handle(message).await?;

            if self.context.state().is_exited() {
                self.transport.close().await?;
                let code = self.context.exit_code().unwrap_or(1);
                return Ok(SessionEnd::Exited { code });
            }
        }
    }

    /// Process one decoded message and write whatever it produces.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the stream fails.
    pub async fn handle(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Request(request) => {
                let response = self.dispatch_request(request).await;
                self.transport.write_message(&response).await?;
            }
            Message::Notification(notification) => {
                self.dispatch_notification(notification).await;
            }
            Message::Response(response) => {
                debug!(id = ?response.id, "ignoring client response");
            }
            Message::Malformed { id, error } => {
                warn!("malformed message: {error}");
                let response = JsonRpcResponse::failure(id, error);
                self.transport.write_message(&response).await?;
            }
        }

        for notification in self.context.take_outbox() {
            self.transport.write_message(&notification).await?;
        }
        Ok(())
    }

    async fn dispatch_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;
        debug!(%id, method = %method, "request");
        self.context.record_request_id(id.clone());

        let result = match self.methods.route(&method) {
            None => Err(JsonRpcError::method_not_found(&method)),
            Some(Route {
                handler: Handler::Notification(_),
                ..
            }) => Err(JsonRpcError::invalid_request(format!(
                "{method} is a notification and takes no id"
            ))),
            Some(route) if !route.precondition.permits(self.context.state()) => {
                Err(JsonRpcError::invalid_request(format!(
                    "{method} is not allowed while the session is {}",
                    self.context.state()
                )))
            }
            Some(Route {
                handler: Handler::Request(handler),
                ..
            }) => handler(&mut self.context, params).await,
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => {
                debug!(%id, "request failed: {error}");
                JsonRpcResponse::failure(Some(id), error)
            }
        }
    }

    async fn dispatch_notification(&mut self, notification: JsonRpcNotification) {
        let JsonRpcNotification { method, params, .. } = notification;

        let Some(route) = self.methods.route(&method) else {
            if !method.starts_with("$/") {
                debug!("dropping unknown notification '{method}'");
            }
            return;
        };

        let Handler::Notification(handler) = route.handler else {
            debug!("dropping '{method}': it is a request and needs an id");
            return;
        };

        if !route.precondition.permits(self.context.state()) {
            debug!(
                "dropping '{method}' while the session is {}",
                self.context.state()
            );
            return;
        }

        let shown = params.as_ref().unwrap_or(&Value::Null);
        trace!(method = %method, params = %shown, "notification");
        if let Err(e) = handler(&mut self.context, params).await {
            warn!("handling '{method}' failed: {e}");
        }
    }
}
