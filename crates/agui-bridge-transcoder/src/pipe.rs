//! The AG-UI pipe: chat requests in, agent output out.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_stream::StreamExt;
use tracing::info;

use agui_bridge_core::config::BridgeSettings;
use agui_bridge_core::error::{BridgeError, Result};
use agui_bridge_core::types::{ChatRequest, ModelEntry, RunInvocation};

use crate::diagnostics::{DiagnosticsSnapshot, StreamDiagnostics};
use crate::request::transcode;
use crate::stream::{ChunkStream, StreamTranscoder};
use crate::unary::UnaryTranscoder;
use crate::{ChatPipe, PipeOutput};

/// Build the HTTP client shared by every call of one pipe.
pub fn build_client(settings: &BridgeSettings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .read_timeout(settings.read_timeout)
        .build()
        .map_err(|e| BridgeError::Transport(e.to_string()))
}

/// Forwards chat requests to one AG-UI endpoint.
pub struct AgUiPipe {
    settings: BridgeSettings,
    streaming: StreamTranscoder,
    unary: UnaryTranscoder,
    diagnostics: Arc<StreamDiagnostics>,
}

impl AgUiPipe {
    /// Pipe identifier; model ids are exposed as `{ID}.{model}`.
    pub const ID: &'static str = "aguimiddleware";

    pub fn new(settings: BridgeSettings) -> Result<Self> {
        let client = build_client(&settings)?;
        let diagnostics = Arc::new(StreamDiagnostics::new());
        Ok(Self {
            streaming: StreamTranscoder::new(
                client.clone(),
                settings.endpoint_url.clone(),
                diagnostics.clone(),
            ),
            unary: UnaryTranscoder::new(client, settings.endpoint_url.clone(), diagnostics.clone()),
            settings,
            diagnostics,
        })
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    pub fn transcode(&self, request: &ChatRequest) -> RunInvocation {
        transcode(request, &self.settings)
    }

    pub fn stream(&self, invocation: RunInvocation) -> ChunkStream {
        self.streaming.stream(invocation)
    }

    pub async fn invoke(&self, invocation: RunInvocation) -> String {
        self.unary.invoke(invocation).await
    }
}

#[async_trait]
impl ChatPipe for AgUiPipe {
    fn id(&self) -> &str {
        Self::ID
    }

    fn models(&self) -> Vec<ModelEntry> {
        self.settings.models.catalog().to_vec()
    }

    async fn pipe(&self, request: ChatRequest) -> PipeOutput {
        let invocation = self.transcode(&request);
        let streaming = request.wants_stream();
        info!(
            endpoint = %self.settings.endpoint_url,
            thread_id = %invocation.thread_id,
            run_id = %invocation.run_id,
            model = %invocation.forwarded_props.model,
            messages = invocation.messages.len(),
            streaming,
            "Forwarding chat request to AG-UI endpoint"
        );

        if streaming {
            PipeOutput::Stream(Box::pin(self.stream(invocation).map(String::from)))
        } else {
            PipeOutput::Text(self.invoke(invocation).await)
        }
    }

    fn diagnostics(&self) -> Option<DiagnosticsSnapshot> {
        Some(self.diagnostics.snapshot())
    }
}
