//! Listener and connection accounting.

use std::time::Duration;

use anyhow::Result;
use serde_json::{Value, json};

use crate::common::mock_services::{RunningServer, default_services, rule_services};
use crate::common::test_client::{TestClient, eventually};

#[tokio::test]
async fn test_counter_tracks_every_exit_path() -> Result<()> {
    let server = RunningServer::start(default_services()).await?;
    let registry = server.registry.clone();

    let mut clean = TestClient::connect(server.addr).await?;
    let mut abrupt = TestClient::connect(server.addr).await?;
    let dropped = TestClient::connect(server.addr).await?;

    clean.handshake(json!({})).await?;
    abrupt.handshake(json!({})).await?;
    assert!(eventually(|| registry.live() == 3).await);

    clean.shutdown_and_exit().await?;
    assert!(clean.is_closed().await?);
    assert!(eventually(|| registry.live() == 2).await);

    // exit without shutdown still closes the connection
    abrupt.notify("exit", Value::Null).await?;
    assert!(abrupt.is_closed().await?);
    assert!(eventually(|| registry.live() == 1).await);

    drop(dropped);
    assert!(eventually(|| registry.live() == 0).await);

    // Nothing decrements twice.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.live(), 0);
    Ok(())
}

#[tokio::test]
async fn test_framing_error_closes_only_that_connection() -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let server = RunningServer::start(default_services()).await?;
    let registry = server.registry.clone();

    let mut healthy = TestClient::connect(server.addr).await?;
    healthy.request("initialize", json!({})).await?;

    let mut broken = tokio::net::TcpStream::connect(server.addr).await?;
    broken.write_all(b"Content-Length: twelve\r\n\r\n{}").await?;
    assert!(eventually(|| registry.live() == 1).await);

    let response = healthy.request("shutdown", Value::Null).await?;
    assert_eq!(response["result"], json!({}));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_sessions_are_independent() -> Result<()> {
    // A slow diagnostics run on one connection must not hold up the other.
    let server = RunningServer::start(rule_services(Duration::from_millis(500))).await?;

    let mut slow = TestClient::connect(server.addr).await?;
    let mut fast = TestClient::connect(server.addr).await?;
    slow.handshake(json!({})).await?;
    fast.handshake(json!({})).await?;

    slow.notify(
        "textDocument/didOpen",
        json!({"textDocument": {
            "uri": "file:///rules/slow.yar",
            "languageId": "yara",
            "version": 1,
            "text": "rule slow {"
        }}),
    )
    .await?;
    let slow_id = slow
        .send_request(
            "textDocument/definition",
            json!({
                "textDocument": {"uri": "file:///rules/two.yar"},
                "position": {"line": 2, "character": 0}
            }),
        )
        .await?;

    let started = tokio::time::Instant::now();
    for line in [2, 8, 5] {
        let response = fast
            .request(
                "textDocument/definition",
                json!({
                    "textDocument": {"uri": "file:///rules/two.yar"},
                    "position": {"line": line, "character": 0}
                }),
            )
            .await?;
        assert!(response.get("error").is_none());
    }
    assert!(started.elapsed() < Duration::from_millis(400));

    // The slow connection still answers in order: publish first, then the
    // definition response.
    let published = slow.read().await?;
    assert_eq!(published["method"], "textDocument/publishDiagnostics");
    let response = slow.read().await?;
    assert_eq!(response["id"], slow_id);
    assert_eq!(response["result"]["range"]["start"]["line"], 0);
    Ok(())
}

#[tokio::test]
async fn test_interleaved_requests_keep_order() -> Result<()> {
    let server = RunningServer::start(rule_services(Duration::ZERO)).await?;

    let mut first = TestClient::connect(server.addr).await?;
    let mut second = TestClient::connect(server.addr).await?;
    first.handshake(json!({})).await?;
    second.handshake(json!({})).await?;

    let mut first_ids = Vec::new();
    let mut second_ids = Vec::new();
    for line in 0..5 {
        let params = json!({
            "textDocument": {"uri": "file:///rules/two.yar"},
            "position": {"line": line, "character": 0}
        });
        first_ids.push(first.send_request("textDocument/definition", params.clone()).await?);
        second_ids.push(second.send_request("textDocument/definition", params).await?);
    }

    for id in first_ids {
        assert_eq!(first.read().await?["id"], id);
    }
    for id in second_ids {
        assert_eq!(second.read().await?["id"], id);
    }
    Ok(())
}
