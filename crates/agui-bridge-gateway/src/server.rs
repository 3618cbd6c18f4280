//! Axum-based HTTP server.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use agui_bridge_core::types::ChatRequest;
use agui_bridge_transcoder::PipeOutput;

use crate::state::GatewayState;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Build the gateway router.
pub fn router(state: Arc<GatewayState>) -> Router {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/models", get(models_handler))
        .route("/pipe", post(pipe_handler));

    #[cfg(feature = "metrics")]
    let app = app.route("/metrics", get(metrics_handler));

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP server and run until ctrl-c.
pub async fn start_gateway(state: Arc<GatewayState>, port: u16) -> anyhow::Result<()> {
    let addr = format!("{}:{port}", state.bind_addr());
    let pipe_id = state.pipe.id().to_string();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(pipe = %pipe_id, "Gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "pipe": state.pipe.id(),
        "endpoint": state.config.endpoint_url(),
        "diagnostics": state.pipe.diagnostics(),
    }))
}

async fn models_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(state.pipe.models())
}

async fn pipe_handler(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    #[cfg(feature = "metrics")]
    let started = std::time::Instant::now();

    let output = state.pipe.pipe(request).await;

    #[cfg(feature = "metrics")]
    {
        let mode = match output {
            PipeOutput::Stream(_) => "stream",
            PipeOutput::Text(_) => "text",
        };
        crate::metrics::record_pipe_request(mode);
        crate::metrics::record_pipe_latency(mode, started.elapsed().as_secs_f64());
    }

    match output {
        PipeOutput::Text(text) => ([(header::CONTENT_TYPE, TEXT_PLAIN)], text).into_response(),
        PipeOutput::Stream(chunks) => {
            let body = Body::from_stream(chunks.map(Ok::<_, Infallible>));
            ([(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
        }
    }
}

#[cfg(feature = "metrics")]
async fn metrics_handler(State(state): State<Arc<GatewayState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install ctrl-c handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
