//! Protocol behavior over a real TCP connection.

use std::time::Duration;

use anyhow::Result;
use serde_json::{Value, json};

use crate::common::mock_services::{RunningServer, default_services, rule_services};
use crate::common::test_client::TestClient;

fn all_dynamic() -> Value {
    json!({
        "textDocument": {
            "synchronization": {"dynamicRegistration": true},
            "completion": {"dynamicRegistration": true},
            "definition": {"dynamicRegistration": true},
            "references": {"dynamicRegistration": true},
            "documentHighlight": {"dynamicRegistration": true},
            "rename": {"dynamicRegistration": true}
        }
    })
}

fn position(line: u32, character: u32) -> Value {
    json!({
        "textDocument": {"uri": "file:///rules/two.yar"},
        "position": {"line": line, "character": character}
    })
}

#[tokio::test]
async fn test_initialize_announces_declared_features() -> Result<()> {
    let server = RunningServer::start(default_services()).await?;
    let mut client = TestClient::connect(server.addr).await?;

    let response = client.handshake(all_dynamic()).await?;
    let result = &response["result"];

    assert_eq!(result["serverInfo"]["name"], "yarals");
    assert_eq!(result["capabilities"]["definitionProvider"], true);
    assert_eq!(
        result["capabilities"]["completionProvider"]["resolveProvider"],
        true
    );
    assert_eq!(
        result["capabilities"]["executeCommandProvider"]["commands"][0],
        "yara.CompileRule"
    );

    client.shutdown_and_exit().await?;
    assert!(client.is_closed().await?);
    Ok(())
}

#[tokio::test]
async fn test_requests_before_initialize_are_rejected() -> Result<()> {
    let server = RunningServer::start(rule_services(Duration::ZERO)).await?;
    let mut client = TestClient::connect(server.addr).await?;

    let response = client.request("textDocument/definition", position(8, 4)).await?;
    assert_eq!(response["error"]["code"], -32600);

    let response = client.request("shutdown", Value::Null).await?;
    assert_eq!(response["error"]["code"], -32600);

    // The session is still usable.
    let response = client.request("initialize", json!({})).await?;
    assert!(response["result"].is_object());
    Ok(())
}

#[tokio::test]
async fn test_delegated_requests() -> Result<()> {
    let server = RunningServer::start(rule_services(Duration::ZERO)).await?;
    let mut client = TestClient::connect(server.addr).await?;
    client.handshake(all_dynamic()).await?;

    let definition = client.request("textDocument/definition", position(8, 4)).await?;
    assert_eq!(
        definition["result"]["range"],
        json!({"start": {"line": 6, "character": 0}, "end": {"line": 11, "character": 0}})
    );

    let between_rules = client.request("textDocument/definition", position(5, 0)).await?;
    assert_eq!(between_rules["result"], json!({}));

    let mut references = position(2, 4);
    references["context"] = json!({"includeDeclaration": true});
    let references = client.request("textDocument/references", references).await?;
    assert_eq!(references["error"]["code"], -32603);
    assert!(
        references["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("reference index is corrupt"))
    );

    let mut rename = position(0, 6);
    rename["newName"] = json!("renamed");
    let rename = client.request("textDocument/rename", rename).await?;
    assert_eq!(rename["result"], json!({}));

    let highlight = client.request("textDocument/documentHighlight", position(0, 6)).await?;
    assert_eq!(highlight["result"][0]["range"]["end"]["character"], 9);

    let completion = client.request("textDocument/completion", position(9, 8)).await?;
    assert_eq!(completion["result"][0]["label"], "filesize");

    let resolved = client
        .request("completionItem/resolve", json!({"label": "filesize"}))
        .await?;
    assert_eq!(resolved["result"]["detail"], "size of the scanned file");

    client.shutdown_and_exit().await?;
    Ok(())
}

#[tokio::test]
async fn test_invalid_params_and_unknown_methods() -> Result<()> {
    let server = RunningServer::start(default_services()).await?;
    let mut client = TestClient::connect(server.addr).await?;
    client.handshake(json!({})).await?;

    let response = client
        .request("textDocument/definition", json!({"position": {"line": -1}}))
        .await?;
    assert_eq!(response["error"]["code"], -32602);

    let response = client.request("textDocument/hover", position(0, 0)).await?;
    assert_eq!(response["error"]["code"], -32601);
    Ok(())
}

#[tokio::test]
async fn test_malformed_payloads() -> Result<()> {
    let server = RunningServer::start(default_services()).await?;
    let mut client = TestClient::connect(server.addr).await?;

    client
        .send_raw(&json!({"id": 1, "method": "initialize", "params": {}}))
        .await?;
    let response = client.read().await?;
    assert_eq!(response["id"], 1);
    assert_eq!(response["error"]["code"], -32600);

    client.send_raw(&json!("just a string")).await?;
    let response = client.read().await?;
    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["error"]["code"], -32600);

    let response = client.request("initialize", json!({})).await?;
    assert!(response["result"].is_object());
    Ok(())
}

#[tokio::test]
async fn test_did_open_publishes_diagnostics() -> Result<()> {
    let server = RunningServer::start(rule_services(Duration::ZERO)).await?;
    let mut client = TestClient::connect(server.addr).await?;
    client.handshake(all_dynamic()).await?;

    client
        .notify(
            "textDocument/didOpen",
            json!({"textDocument": {
                "uri": "file:///rules/broken.yar",
                "languageId": "yara",
                "version": 1,
                "text": "rule broken {"
            }}),
        )
        .await?;

    let published = client.read().await?;
    assert_eq!(published["method"], "textDocument/publishDiagnostics");
    assert_eq!(published["params"]["uri"], "file:///rules/broken.yar");
    let diagnostic = &published["params"]["diagnostics"][0];
    assert_eq!(diagnostic["message"], "syntax error, unexpected end of file");
    assert_eq!(diagnostic["severity"], 1);
    assert_eq!(diagnostic["source"], "yara-lang");
    Ok(())
}

#[tokio::test]
async fn test_did_open_without_compiler_stays_silent() -> Result<()> {
    let server = RunningServer::start(default_services()).await?;
    let mut client = TestClient::connect(server.addr).await?;
    client.handshake(all_dynamic()).await?;

    client
        .notify(
            "textDocument/didOpen",
            json!({"textDocument": {
                "uri": "file:///rules/a.yar",
                "languageId": "yara",
                "version": 1,
                "text": "rule a { condition: true }"
            }}),
        )
        .await?;

    // The next thing on the wire is the shutdown response, not a publish.
    let response = client.request("shutdown", Value::Null).await?;
    assert_eq!(response["result"], json!({}));
    Ok(())
}

#[tokio::test]
async fn test_configuration_enables_compile_on_save() -> Result<()> {
    let server = RunningServer::start(rule_services(Duration::ZERO)).await?;
    let mut client = TestClient::connect(server.addr).await?;
    client.handshake(all_dynamic()).await?;

    let save = json!({
        "textDocument": {"uri": "file:///rules/two.yar"},
        "text": "rule x {"
    });

    client.notify("textDocument/didSave", save.clone()).await?;
    client
        .notify(
            "workspace/didChangeConfiguration",
            json!({"settings": {"yara": {"compileOnSave": true, "trace": {"server": "verbose"}}}}),
        )
        .await?;
    client.notify("textDocument/didSave", save).await?;

    let published = client.read().await?;
    assert_eq!(published["method"], "textDocument/publishDiagnostics");
    assert_eq!(published["params"]["uri"], "file:///rules/two.yar");
    Ok(())
}
