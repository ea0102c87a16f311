//! Canned capability implementations and listener helpers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lsp_types::{
    CompletionItem, CompletionParams, CompletionResponse, DocumentHighlight,
    DocumentHighlightParams, GotoDefinitionParams, GotoDefinitionResponse, ReferenceParams,
    RenameParams, WorkspaceEdit,
};
use tokio::sync::oneshot;
use yarals_core::capability::{
    DiagnosticsProvider, NoSymbols, SymbolProvider, UnavailableDiagnostics,
};
use yarals_core::config::ServerConfig;
use yarals_core::text::{
    Diagnostic, DiagnosticSeverity, Location, Position, Range, Uri, diagnostic, rule_range_at,
};
use yarals_core::{ConnectionRegistry, Error, Listener, Result, Services};

/// Answers definitions with the rule block under the cursor and fails
/// reference lookups, so both outcomes can be observed on the wire.
pub struct RuleSymbols {
    pub document: String,
}

#[async_trait]
impl SymbolProvider for RuleSymbols {
    async fn definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params;
        Ok(rule_range_at(&self.document, position.position).map(|range| {
            GotoDefinitionResponse::Scalar(Location::new(position.text_document.uri, range))
        }))
    }

    async fn references(&self, _params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        Err(Error::Delegate("reference index is corrupt".to_string()))
    }

    async fn rename(&self, _params: RenameParams) -> Result<Option<WorkspaceEdit>> {
        Ok(None)
    }

    async fn document_highlight(
        &self,
        _params: DocumentHighlightParams,
    ) -> Result<Option<Vec<DocumentHighlight>>> {
        Ok(Some(vec![DocumentHighlight {
            range: Range::new(Position::new(0, 5), Position::new(0, 9)),
            kind: None,
        }]))
    }

    async fn completion(&self, _params: CompletionParams) -> Result<Option<CompletionResponse>> {
        Ok(Some(CompletionResponse::Array(vec![CompletionItem {
            label: "filesize".to_string(),
            ..Default::default()
        }])))
    }

    async fn resolve_completion(&self, mut item: CompletionItem) -> Result<Option<CompletionItem>> {
        item.detail = Some("size of the scanned file".to_string());
        Ok(Some(item))
    }
}

/// Reports one error on the first line after a delay.
pub struct SlowDiagnostics {
    pub delay: Duration,
}

#[async_trait]
impl DiagnosticsProvider for SlowDiagnostics {
    async fn diagnose(&self, _uri: &Uri, _text: &str) -> Result<Vec<Diagnostic>> {
        tokio::time::sleep(self.delay).await;
        Ok(diagnostic(
            Range::new(Position::new(0, 0), Position::new(1, 0)),
            DiagnosticSeverity::ERROR,
            None,
            "syntax error, unexpected end of file",
            Vec::new(),
        )
        .into_iter()
        .collect())
    }
}

pub const TWO_RULES: &str = "\
rule first
{
    condition:
        true
}

rule second
{
    condition:
        filesize < 10
}
";

#[allow(dead_code)]
pub fn default_services() -> Services {
    Services::new(
        Arc::new(NoSymbols),
        Arc::new(UnavailableDiagnostics::new("no compiler in tests")),
    )
}

#[allow(dead_code)]
pub fn rule_services(diagnostics_delay: Duration) -> Services {
    Services::new(
        Arc::new(RuleSymbols {
            document: TWO_RULES.to_string(),
        }),
        Arc::new(SlowDiagnostics {
            delay: diagnostics_delay,
        }),
    )
}

/// A listener running on an ephemeral loopback port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub registry: ConnectionRegistry,
    stop: Option<oneshot::Sender<()>>,
}

/// Route library logs to the test harness; `RUST_LOG` picks the level.
pub fn init_test_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .ok();
}

impl RunningServer {
    pub async fn start(services: Services) -> anyhow::Result<Self> {
        init_test_logging();

        let mut config = ServerConfig::default();
        config.listener.port = 0;

        let listener = Listener::bind(&config, services).await?;
        let addr = listener.local_addr()?;
        let registry = listener.registry();
        let (stop, stopped) = oneshot::channel::<()>();

        tokio::spawn(listener.run_until(async move {
            let _ = stopped.await;
        }));

        Ok(Self {
            addr,
            registry,
            stop: Some(stop),
        })
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
