//! Framed TCP client for driving a running listener.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use yarals_core::rpc::MessageTransport;

const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Simulates an editor connected over TCP.
pub struct TestClient {
    transport: MessageTransport<BufReader<OwnedReadHalf>, OwnedWriteHalf>,
    request_id: i64,
}

#[allow(dead_code)]
impl TestClient {
    /// Connect to a listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is refused.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {addr}"))?;
        let (read, write) = stream.into_split();
        Ok(Self {
            transport: MessageTransport::new(BufReader::new(read), write),
            request_id: 0,
        })
    }

    /// Send a request with the next id and return that id.
    pub async fn send_request(&mut self, method: &str, params: Value) -> Result<i64> {
        self.request_id += 1;
        let id = self.request_id;
        self.send_raw(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await?;
        Ok(id)
    }

    /// Send a request and wait for its response, skipping server notifications.
    pub async fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        let id = self.send_request(method, params).await?;
        loop {
            let message = self.read().await?;
            if message.get("id").is_some() {
                if message["id"] != json!(id) {
                    bail!("expected response to {id}, got {message}");
                }
                return Ok(message);
            }
        }
    }

    /// Send a notification.
    pub async fn notify(&mut self, method: &str, params: Value) -> Result<()> {
        self.send_raw(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .await
    }

    /// Send any JSON value as one framed message.
    pub async fn send_raw(&mut self, message: &Value) -> Result<()> {
        self.transport
            .write_message(message)
            .await
            .context("failed to write message")
    }

    /// Read the next message as raw JSON.
    pub async fn read(&mut self) -> Result<Value> {
        let payload = tokio::time::timeout(READ_TIMEOUT, self.transport.read_payload())
            .await
            .context("timed out waiting for the server")??
            .context("server closed the connection")?;
        serde_json::from_slice(&payload).context("server sent invalid JSON")
    }

    /// Whether the server has closed its side of the connection.
    pub async fn is_closed(&mut self) -> Result<bool> {
        let next = tokio::time::timeout(READ_TIMEOUT, self.transport.read_payload())
            .await
            .context("timed out waiting for the server")??;
        Ok(next.is_none())
    }

    /// Run `initialize` with the given client capabilities, then `initialized`.
    ///
    /// Returns the `initialize` response; the pushed welcome message is consumed.
    pub async fn handshake(&mut self, capabilities: Value) -> Result<Value> {
        let response = self
            .request(
                "initialize",
                json!({"rootUri": null, "capabilities": capabilities}),
            )
            .await?;
        self.notify("initialized", json!({})).await?;
        let welcome = self.read().await?;
        if welcome["method"] != json!("window/showMessage") {
            bail!("expected window/showMessage, got {welcome}");
        }
        Ok(response)
    }

    /// Send `shutdown` then `exit`.
    pub async fn shutdown_and_exit(&mut self) -> Result<()> {
        let response = self.request("shutdown", Value::Null).await?;
        if response.get("result") != Some(&json!({})) {
            bail!("unexpected shutdown response {response}");
        }
        self.notify("exit", Value::Null).await
    }
}

/// Poll `check` until it holds or a few seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check()
}
