//! Chat-UI ⇄ AG-UI transcoding.
//!
//! A [`ChatPipe`] takes a chat-UI request and answers with either one text
//! reply or a stream of text chunks. [`AgUiPipe`] implements it on top of an
//! AG-UI agent endpoint: requests are rewritten into `RunAgentInput`
//! ([`request`]), and the agent's SSE event stream is relayed back as
//! chat-visible chunks ([`stream`]).

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_stream::StreamExt;

use agui_bridge_core::types::{ChatRequest, ModelEntry};

pub mod chunk;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod pipe;
pub mod request;
pub mod sse;
pub mod stream;
pub mod unary;

pub use chunk::OutputChunk;
pub use diagnostics::{DiagnosticsSnapshot, StreamDiagnostics};
pub use error::{Failure, FailureKind};
pub use pipe::AgUiPipe;

/// What a pipe hands back to the chat UI.
pub enum PipeOutput {
    Text(String),
    Stream(BoxStream<'static, String>),
}

impl PipeOutput {
    /// Drain the output into a single string.
    pub async fn collect_text(self) -> String {
        match self {
            PipeOutput::Text(text) => text,
            PipeOutput::Stream(mut stream) => {
                let mut out = String::new();
                while let Some(chunk) = stream.next().await {
                    out.push_str(&chunk);
                }
                out
            }
        }
    }
}

impl fmt::Debug for PipeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipeOutput::Text(text) => f.debug_tuple("Text").field(text).finish(),
            PipeOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A chat-UI backend.
#[async_trait]
pub trait ChatPipe: Send + Sync {
    /// Pipe identifier (e.g., "aguimiddleware").
    fn id(&self) -> &str;

    /// Models offered to the chat UI.
    fn models(&self) -> Vec<ModelEntry>;

    /// Handle one chat request. Failures are reported as text, never as errors.
    async fn pipe(&self, request: ChatRequest) -> PipeOutput;

    /// Counters for health reporting, if the pipe keeps any.
    fn diagnostics(&self) -> Option<DiagnosticsSnapshot> {
        None
    }
}
