//! Pipe integration tests against a fake AG-UI agent on a local port.
//!
//! Run with: `cargo test -p agui-bridge-transcoder --test integration`

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio_stream::StreamExt;

use agui_bridge_core::config::BridgeSettings;
use agui_bridge_core::types::{ChatMessage, ChatRequest};
use agui_bridge_transcoder::{AgUiPipe, ChatPipe, PipeOutput};

/// What the fake agent answers with.
#[derive(Clone)]
enum Reply {
    Sse(Vec<String>),
    Json(Value),
    Status(StatusCode, String),
}

#[derive(Clone)]
struct Agent {
    reply: Reply,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn agent_handler(
    State(agent): State<Agent>,
    headers: HeaderMap,
    body: axum::Json<Value>,
) -> Response {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    agent.seen.lock().unwrap().push((accept, body.0));

    match agent.reply {
        Reply::Sse(events) => {
            let body: String = events.iter().map(|e| format!("data: {e}\n\n")).collect();
            ([(header::CONTENT_TYPE, "text/event-stream")], Body::from(body)).into_response()
        }
        Reply::Json(value) => axum::Json(value).into_response(),
        Reply::Status(status, text) => (status, text).into_response(),
    }
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Start a fake agent; returns its URL and the requests it receives.
async fn start_agent(reply: Reply) -> (String, Arc<Mutex<Vec<(Option<String>, Value)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route("/", post(agent_handler)).with_state(Agent {
        reply,
        seen: seen.clone(),
    });
    (serve(app).await, seen)
}

/// Serve `app` on an ephemeral port and return its URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/")
}

/// Signals when the agent's response body is dropped.
struct BodyDropped(Option<oneshot::Sender<()>>);

impl Drop for BodyDropped {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

fn sse(events: &[Value]) -> Reply {
    Reply::Sse(events.iter().map(Value::to_string).collect())
}

fn chat(stream: bool) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::new("system", "Be brief."),
            ChatMessage::new("user", "hi"),
        ],
        model: Some("aguimiddleware.agui-agent".into()),
        stream: Some(stream),
        ..ChatRequest::default()
    }
}

async fn stream_chunks(pipe: &AgUiPipe, request: ChatRequest) -> Vec<String> {
    match pipe.pipe(request).await {
        PipeOutput::Stream(stream) => stream.collect().await,
        PipeOutput::Text(text) => panic!("expected a stream, got text: {text}"),
    }
}

#[tokio::test]
async fn test_streaming_text_run() {
    let (url, seen) = start_agent(sse(&[
        json!({"type": "RUN_STARTED", "threadId": "t", "runId": "r"}),
        json!({"type": "TEXT_MESSAGE_START", "messageId": "m", "role": "assistant"}),
        json!({"type": "TEXT_MESSAGE_CONTENT", "messageId": "m", "delta": "Hi"}),
        json!({"type": "TEXT_MESSAGE_CONTENT", "messageId": "m", "delta": " there"}),
        json!({"type": "TEXT_MESSAGE_END", "messageId": "m"}),
        json!({"type": "RUN_FINISHED", "threadId": "t", "runId": "r"}),
    ]))
    .await;

    let pipe = AgUiPipe::new(BridgeSettings::for_endpoint(url)).unwrap();
    let chunks = stream_chunks(&pipe, chat(true)).await;
    assert_eq!(chunks, vec!["Hi", " there"]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (accept, body) = &seen[0];
    assert_eq!(accept.as_deref(), Some("text/event-stream"));
    assert!(body["threadId"].as_str().unwrap().starts_with("openwebui_"));
    assert!(body["runId"].as_str().unwrap().starts_with("run_"));
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["forwardedProps"]["model"], "agui-agent");
    assert_eq!(body["forwardedProps"]["openwebui_request"], true);

    let diag = pipe.diagnostics().unwrap();
    assert_eq!(diag.runs, 1);
    assert_eq!(diag.chunks, 2);
}

#[tokio::test]
async fn test_streaming_skips_malformed_line() {
    let (url, _) = start_agent(Reply::Sse(vec![
        json!({"type": "TEXT_MESSAGE_CONTENT", "delta": "a"}).to_string(),
        "{broken".to_string(),
        json!({"type": "TEXT_MESSAGE_CONTENT", "delta": "b"}).to_string(),
        json!({"type": "RUN_FINISHED"}).to_string(),
    ]))
    .await;

    let pipe = AgUiPipe::new(BridgeSettings::for_endpoint(url)).unwrap();
    let chunks = stream_chunks(&pipe, chat(true)).await;
    assert_eq!(chunks, vec!["a", "b"]);
    assert_eq!(pipe.diagnostics().unwrap().malformed, 1);
}

#[tokio::test]
async fn test_streaming_tool_call() {
    let (url, _) = start_agent(sse(&[
        json!({"type": "TOOL_CALL_START", "toolCallId": "c1", "toolCallName": "lookup"}),
        json!({"type": "TOOL_CALL_ARGS", "toolCallId": "c1", "delta": "{\"q\":1}"}),
        json!({"type": "TOOL_CALL_END", "toolCallId": "c1"}),
        json!({"type": "TOOL_CALL_RESULT", "toolCallId": "c1", "content": "found"}),
        json!({"type": "RUN_FINISHED"}),
    ]))
    .await;

    let pipe = AgUiPipe::new(BridgeSettings::for_endpoint(url)).unwrap();
    let chunks = stream_chunks(&pipe, chat(true)).await;
    assert_eq!(
        chunks,
        vec![
            "\n**🔧 Calling tool: `lookup`**\n",
            "{\"q\":1}",
            "\n",
            "**📋 Tool result:**\n```\nfound\n```\n\n",
        ]
    );
}

#[tokio::test]
async fn test_streaming_run_error() {
    let (url, _) = start_agent(sse(&[
        json!({"type": "RUN_STARTED"}),
        json!({"type": "RUN_ERROR", "message": "agent crashed", "code": 500}),
        json!({"type": "TEXT_MESSAGE_CONTENT", "delta": "never"}),
    ]))
    .await;

    let pipe = AgUiPipe::new(BridgeSettings::for_endpoint(url)).unwrap();
    let chunks = stream_chunks(&pipe, chat(true)).await;
    assert_eq!(chunks, vec!["Error from AG-UI endpoint: agent crashed"]);
}

#[tokio::test]
async fn test_validation_error_is_field_level() {
    let (url, _) = start_agent(Reply::Status(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!([{"loc": ["body", "messages", 0, "id"], "msg": "field required"}]).to_string(),
    ))
    .await;

    let pipe = AgUiPipe::new(BridgeSettings::for_endpoint(url)).unwrap();
    let chunks = stream_chunks(&pipe, chat(true)).await;
    assert_eq!(chunks, vec!["Validation Error: body.messages.0.id: field required"]);
    assert_eq!(pipe.diagnostics().unwrap().failures, 1);
}

#[tokio::test]
async fn test_server_error_status() {
    let (url, _) = start_agent(Reply::Status(
        StatusCode::INTERNAL_SERVER_ERROR,
        "boom".to_string(),
    ))
    .await;

    let pipe = AgUiPipe::new(BridgeSettings::for_endpoint(url)).unwrap();
    let chunks = stream_chunks(&pipe, chat(true)).await;
    assert_eq!(chunks, vec!["Error: AG-UI endpoint returned 500: boom"]);

    let text = pipe.pipe(chat(false)).await.collect_text().await;
    assert_eq!(text, "Error: AG-UI endpoint returned 500: boom");
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let url = format!("http://127.0.0.1:{}", find_free_port());
    let pipe = AgUiPipe::new(BridgeSettings::for_endpoint(url.clone())).unwrap();

    let chunks = stream_chunks(&pipe, chat(true)).await;
    assert_eq!(
        chunks,
        vec![format!(
            "Error: Failed to connect to AG-UI endpoint at {url}. Please check if the AG-UI endpoint is running."
        )]
    );
}

#[tokio::test]
async fn test_non_streaming_content() {
    let (url, seen) = start_agent(Reply::Json(json!({"content": "Hello"}))).await;

    let pipe = AgUiPipe::new(BridgeSettings::for_endpoint(url)).unwrap();
    match pipe.pipe(chat(false)).await {
        PipeOutput::Text(text) => assert_eq!(text, "Hello"),
        other => panic!("expected text, got {other:?}"),
    }

    let seen = seen.lock().unwrap();
    let (accept, body) = &seen[0];
    assert_eq!(accept.as_deref(), Some("application/json"));
    assert_eq!(body["state"]["stream"], false);
}

#[tokio::test]
async fn test_non_streaming_unknown_shape() {
    let (url, _) = start_agent(Reply::Json(json!({"foo": 1}))).await;

    let pipe = AgUiPipe::new(BridgeSettings::for_endpoint(url)).unwrap();
    let text = pipe.pipe(chat(false)).await.collect_text().await;
    assert_eq!(text, "{\n  \"foo\": 1\n}");
}

#[tokio::test]
async fn test_dropping_the_stream_closes_the_agent_response() {
    let (tx, rx) = oneshot::channel();
    let dropped = Arc::new(Mutex::new(Some(BodyDropped(Some(tx)))));

    // One text delta, then keep-alive comments until the client goes away.
    let app = Router::new().route(
        "/",
        post(move || {
            let guard = dropped.lock().unwrap().take();
            async move {
                let first = format!(
                    "data: {}\n\n",
                    json!({"type": "TEXT_MESSAGE_CONTENT", "delta": "first"})
                );
                let body = futures::stream::unfold((guard, Some(first)), |(guard, next)| async move {
                    let frame = match next {
                        Some(frame) => frame,
                        None => {
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            ": ping\n\n".to_string()
                        }
                    };
                    Some((Ok::<_, Infallible>(Bytes::from(frame)), (guard, None)))
                });
                (
                    [(header::CONTENT_TYPE, "text/event-stream")],
                    Body::from_stream(body),
                )
            }
        }),
    );
    let url = serve(app).await;

    let pipe = AgUiPipe::new(BridgeSettings::for_endpoint(url)).unwrap();
    let PipeOutput::Stream(mut stream) = pipe.pipe(chat(true)).await else {
        panic!("expected a stream");
    };
    assert_eq!(stream.next().await.as_deref(), Some("first"));
    drop(stream);

    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("agent response still open after the stream was dropped")
        .unwrap();
}

#[tokio::test]
async fn test_stalled_stream_hits_read_timeout() {
    let app = Router::new().route(
        "/",
        post(|| async {
            let started = format!("data: {}\n\n", json!({"type": "RUN_STARTED"}));
            let body = futures::stream::once(async move { Ok::<_, Infallible>(Bytes::from(started)) })
                .chain(futures::stream::once(async {
                    std::future::pending::<Result<Bytes, Infallible>>().await
                }));
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(body),
            )
        }),
    );
    let url = serve(app).await;

    let settings = BridgeSettings {
        read_timeout: Duration::from_millis(200),
        ..BridgeSettings::for_endpoint(url)
    };
    let pipe = AgUiPipe::new(settings).unwrap();
    let chunks = tokio::time::timeout(Duration::from_secs(10), stream_chunks(&pipe, chat(true)))
        .await
        .expect("stalled stream never timed out");

    assert_eq!(chunks.len(), 1);
    assert!(
        chunks[0].starts_with("Error: Failed to connect to AG-UI endpoint: "),
        "{chunks:?}"
    );
    assert_eq!(pipe.diagnostics().unwrap().failures, 1);
}
