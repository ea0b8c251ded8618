//! End-to-end tests for the local wiring against a mocked Ollama server.
#![allow(missing_docs, reason = "integration test crate")]

use pilot_adapters::ChannelNotifier;
use pilot_app::WorkspaceEvent;
use pilot_config::{ValidatedPilotConfig, parse_pilot_config_json};
use pilot_domain::ModelName;
use pilot_infra::{
    LocalWorkspace, ModelAction, chat_workspace, complete_workspace, index_workspace,
    model_lifecycle, prune_workspace, retrieve_workspace,
};
use pilot_ports::{Notification, NotificationPort};
use pilot_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn temp_workspace(label: &str) -> Result<PathBuf> {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let root = std::env::temp_dir().join(format!("pilot-infra-{label}-{unique}"));
    std::fs::create_dir_all(root.join("src"))?;
    std::fs::write(
        root.join("src/math.rs"),
        "pub fn add_numbers(left: i32, right: i32) -> i32 {\n    left + right\n}\n",
    )?;
    std::fs::write(
        root.join("src/render.rs"),
        "pub fn draw_button(label: &str) {\n    paint(label);\n}\n",
    )?;
    std::fs::create_dir_all(root.join("node_modules/dep"))?;
    std::fs::write(root.join("node_modules/dep/index.js"), "module.exports = {};\n")?;
    Ok(root)
}

fn config(server: &MockServer, embedding_model: Option<&str>) -> Result<ValidatedPilotConfig> {
    let mut model = json!({ "serverUrl": server.uri(), "model": "codellama" });
    if let (Some(name), Some(object)) = (embedding_model, model.as_object_mut()) {
        object.insert("embeddingModel".to_owned(), Value::from(name));
    }
    parse_pilot_config_json(&json!({ "model": model }).to_string())
}

async fn mock_embeddings(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .and(body_partial_json(json!({ "model": "nomic-embed-text" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [0.6, 0.8] })))
        .mount(server)
        .await;
}

async fn request_bodies(server: &MockServer, endpoint: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == endpoint)
        .filter_map(|request| serde_json::from_slice(&request.body).ok())
        .collect()
}

fn workspace(root: &Path, config: ValidatedPilotConfig) -> Result<LocalWorkspace> {
    LocalWorkspace::new(root, config, None)
}

#[tokio::test]
async fn index_persists_and_second_run_skips_unchanged_files() -> Result<()> {
    let server = MockServer::start().await;
    mock_embeddings(&server).await;
    let root = temp_workspace("index")?;
    let workspace = workspace(&root, config(&server, Some("nomic-embed-text"))?)?;
    let ctx = RequestContext::new_request();

    let first = index_workspace(&workspace, &ctx, None, false).await?;
    assert_eq!(first.files_indexed, 2);
    assert_eq!(first.total_chunks, 2);
    assert!(first.persist_error.is_none());
    assert!(root.join(".pilot/index.json").is_file());
    assert!(root.join(".pilot/index.meta.json").is_file());

    let second = index_workspace(&workspace, &ctx, None, false).await?;
    assert_eq!(second.files_indexed, 0);
    assert_eq!(second.files_skipped, 2);
    assert_eq!(request_bodies(&server, "/api/embeddings").await.len(), 2);

    std::fs::remove_file(root.join("src/render.rs"))?;
    let pruned = prune_workspace(&workspace, &ctx).await?;
    assert_eq!(pruned.files_removed, 1);
    assert_eq!(pruned.total_files, 1);
    Ok(())
}

#[tokio::test]
async fn single_file_index_accepts_absolute_paths() -> Result<()> {
    let server = MockServer::start().await;
    mock_embeddings(&server).await;
    let root = temp_workspace("single")?;
    let workspace = workspace(&root, config(&server, Some("nomic-embed-text"))?)?;

    let summary = index_workspace(
        &workspace,
        &RequestContext::new_request(),
        Some(&root.join("src/math.rs")),
        false,
    )
    .await?;

    assert_eq!(summary.files_indexed, 1);
    assert_eq!(summary.total_files, 1);
    Ok(())
}

#[tokio::test]
async fn retrieval_returns_scored_chunks_from_the_persisted_index() -> Result<()> {
    let server = MockServer::start().await;
    mock_embeddings(&server).await;
    let root = temp_workspace("retrieve")?;
    let workspace = workspace(&root, config(&server, Some("nomic-embed-text"))?)?;
    let ctx = RequestContext::new_request();
    index_workspace(&workspace, &ctx, None, false).await?;

    let result = retrieve_workspace(&workspace, &ctx, "add two numbers", Some(1)).await?;

    assert_eq!(result.len(), 1);
    assert!(result.iter().all(|scored| (scored.score - 1.0).abs() < 1e-5));
    Ok(())
}

#[tokio::test]
async fn completion_sends_project_context_and_returns_new_text() -> Result<()> {
    let server = MockServer::start().await;
    mock_embeddings(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": "codellama", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "```rust\nlet total = add_numbers(1, 2);\n```"
        })))
        .mount(&server)
        .await;
    let root = temp_workspace("complete")?;
    let workspace = workspace(&root, config(&server, Some("nomic-embed-text"))?)?;
    let ctx = RequestContext::new_request();
    index_workspace(&workspace, &ctx, None, false).await?;

    let text = complete_workspace(&workspace, &ctx, "src/main.rs", "let total = add_numbers(").await?;

    assert_eq!(text.as_deref(), Some("1, 2);"));
    let bodies = request_bodies(&server, "/api/generate").await;
    let prompt = bodies
        .first()
        .and_then(|body| body.get("prompt"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    assert!(prompt.contains("<code_from_other_files>"));
    assert!(prompt.contains("File: src/math.rs"));
    assert!(prompt.contains("The code is written in this file src/main.rs"));
    Ok(())
}

#[tokio::test]
async fn completion_without_embedding_model_skips_project_context() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "x + 1" })))
        .mount(&server)
        .await;
    let root = temp_workspace("complete-plain")?;
    let workspace = workspace(&root, config(&server, None)?)?;

    let text = complete_workspace(
        &workspace,
        &RequestContext::new_request(),
        "main.rs",
        "let y = ",
    )
    .await?;

    assert_eq!(text.as_deref(), Some("x + 1"));
    assert!(request_bodies(&server, "/api/embeddings").await.is_empty());
    Ok(())
}

#[tokio::test]
async fn indexing_requires_an_embedding_model() -> Result<()> {
    let server = MockServer::start().await;
    let root = temp_workspace("no-embedding")?;
    let workspace = workspace(&root, config(&server, None)?)?;

    let error = index_workspace(&workspace, &RequestContext::new_request(), None, false)
        .await
        .err();

    assert_eq!(
        error.map(|error| error.code),
        Some(ErrorCode::new("config", "missing_model"))
    );
    Ok(())
}

#[tokio::test]
async fn unreachable_embedding_server_is_a_dependency_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let root = temp_workspace("unavailable")?;
    let workspace = workspace(&root, config(&server, Some("nomic-embed-text"))?)?;

    let error = index_workspace(&workspace, &RequestContext::new_request(), None, false)
        .await
        .err();

    assert_eq!(
        error.map(|error| error.code),
        Some(ErrorCode::dependency_unavailable())
    );
    Ok(())
}

#[tokio::test]
async fn chat_turn_uses_the_chat_endpoint() -> Result<()> {
    let server = MockServer::start().await;
    mock_embeddings(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "Use add_numbers." }
        })))
        .mount(&server)
        .await;
    let root = temp_workspace("chat")?;
    let workspace = workspace(&root, config(&server, Some("nomic-embed-text"))?)?;
    let ctx = RequestContext::new_request();
    index_workspace(&workspace, &ctx, None, false).await?;

    let reply = chat_workspace(&workspace, &ctx, "how do I add?").await?;

    assert_eq!(reply.content, "Use add_numbers.");
    let bodies = request_bodies(&server, "/api/chat").await;
    let roles: Vec<&str> = bodies
        .first()
        .and_then(|body| body.get("messages"))
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .filter_map(|message| message.get("role").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(roles, vec!["system", "system", "user"]);
    Ok(())
}

#[tokio::test]
async fn unload_sends_zero_keep_alive() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": "llama3", "keep_alive": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "done": true })))
        .expect(1)
        .mount(&server)
        .await;
    let root = temp_workspace("unload")?;
    let workspace = workspace(&root, config(&server, None)?)?;

    model_lifecycle(
        &workspace,
        &RequestContext::new_request(),
        ModelAction::Unload,
        ModelName::parse("llama3")?,
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn wired_session_reports_index_updates() -> Result<()> {
    let server = MockServer::start().await;
    mock_embeddings(&server).await;
    let root = temp_workspace("session")?;
    let workspace = workspace(&root, config(&server, Some("nomic-embed-text"))?)?;
    let (notify_tx, mut notifications) = mpsc::unbounded_channel();
    let session =
        workspace.session(Arc::new(ChannelNotifier::new(notify_tx)) as Arc<dyn NotificationPort>)?;
    let (events, receiver) = mpsc::channel(4);
    let running = tokio::spawn(session.run(receiver));

    let closed = || ErrorEnvelope::expected(ErrorCode::internal(), "session stopped");
    events.send(WorkspaceEvent::Opened).await.map_err(|_| closed())?;
    let mut indexed = None;
    while let Some(notification) = notifications.recv().await {
        if let Notification::IndexUpdated { files: 2, chunks } = notification {
            indexed = Some(chunks);
            break;
        }
    }
    events.send(WorkspaceEvent::Shutdown).await.map_err(|_| closed())?;
    running
        .await
        .map_err(|error| ErrorEnvelope::expected(ErrorCode::internal(), error.to_string()))?;

    assert_eq!(indexed, Some(2));
    Ok(())
}
