//! Streaming transcoder: AG-UI event stream → chat-visible chunks.
//!
//! One call walks `Connecting → Streaming → {Finished, Errored}`. The
//! returned stream is pull-driven: nothing happens until the consumer polls,
//! and dropping it drops the HTTP response, which closes the connection.

use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use agui_bridge_core::types::RunInvocation;

use crate::chunk::OutputChunk;
use crate::diagnostics::StreamDiagnostics;
use crate::error::Failure;
use crate::event::{Classification, WireEvent, classify};
use crate::sse::split_lines;

/// Chunks of one streaming call, in source-event order.
pub type ChunkStream = BoxStream<'static, OutputChunk>;

type LineStream = BoxStream<'static, Result<Vec<u8>, reqwest::Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Connecting,
    Streaming,
    Finished,
    Errored,
}

/// What a single event does to the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Advisory event; nothing to show.
    Skip,
    Emit(OutputChunk),
    /// The run completed; stop reading.
    Finish,
    /// The run failed; show the chunk and stop reading.
    Abort(OutputChunk),
}

/// Map one event to its effect on the stream.
pub fn step(event: WireEvent) -> Step {
    match event {
        WireEvent::TextMessageContent(msg) => match msg.delta {
            Some(delta) if !delta.is_empty() => Step::Emit(OutputChunk::Content(delta)),
            _ => Step::Skip,
        },
        WireEvent::TextMessageStart(msg) => {
            debug!(message_id = msg.message_id.as_deref().unwrap_or("unknown"), "Message started");
            Step::Skip
        }
        WireEvent::TextMessageEnd(msg) => {
            debug!(message_id = msg.message_id.as_deref().unwrap_or("unknown"), "Message ended");
            Step::Skip
        }
        WireEvent::RunStarted(run) => {
            debug!(run_id = run.run_id.as_deref().unwrap_or("unknown"), "Run started");
            Step::Skip
        }
        WireEvent::RunFinished(run) => {
            debug!(run_id = run.run_id.as_deref().unwrap_or("unknown"), "Run finished");
            Step::Finish
        }
        WireEvent::RunError(err) => {
            let message = err.message.unwrap_or_else(|| "Unknown error".to_string());
            warn!(%message, "AG-UI run error");
            Step::Abort(OutputChunk::RunError(message))
        }
        WireEvent::ToolCallStart(call) => {
            let name = call.tool_call_name.unwrap_or_else(|| "unknown".to_string());
            debug!(tool = %name, tool_call_id = call.tool_call_id.as_deref().unwrap_or("unknown"), "Tool call started");
            Step::Emit(OutputChunk::ToolCallStarted { name })
        }
        WireEvent::ToolCallArgs(call) => match call.delta {
            Some(delta) if !delta.is_empty() => Step::Emit(OutputChunk::ToolCallArgs(delta)),
            _ => Step::Skip,
        },
        WireEvent::ToolCallEnd(_) => {
            debug!("Tool call completed");
            Step::Emit(OutputChunk::ToolCallEnded)
        }
        WireEvent::ToolCallResult(result) => match result.content {
            Some(content) if !content.is_empty() => {
                debug!(result = %content, "Tool result");
                Step::Emit(OutputChunk::ToolResult(content))
            }
            _ => Step::Skip,
        },
        WireEvent::Unknown(raw) => {
            debug!(event_type = raw.get("type").and_then(|t| t.as_str()).unwrap_or(""), "Ignoring unknown AG-UI event");
            Step::Skip
        }
    }
}

/// Opens AG-UI runs over HTTP and relays their event streams.
#[derive(Clone)]
pub struct StreamTranscoder {
    client: reqwest::Client,
    endpoint: String,
    diagnostics: Arc<StreamDiagnostics>,
}

impl StreamTranscoder {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        diagnostics: Arc<StreamDiagnostics>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            diagnostics,
        }
    }

    /// Start a streaming run. The request is sent on first poll.
    pub fn stream(&self, invocation: RunInvocation) -> ChunkStream {
        self.diagnostics.record_run();
        let connect: BoxFuture<'static, Result<LineStream, Failure>> = Box::pin(open_event_stream(
            self.client.clone(),
            self.endpoint.clone(),
            invocation,
        ));
        Box::pin(run(Machine {
            phase: StreamPhase::Connecting,
            connect: Some(connect),
            lines: None,
            diagnostics: self.diagnostics.clone(),
        }))
    }
}

/// Relay an already-open line stream (the `Streaming` phase onwards).
pub fn transcode_lines<S, E>(
    lines: S,
    diagnostics: Arc<StreamDiagnostics>,
) -> impl Stream<Item = OutputChunk>
where
    S: Stream<Item = Result<Vec<u8>, E>>,
    E: Display,
{
    run(Machine {
        phase: StreamPhase::Streaming,
        connect: None,
        lines: Some(Box::pin(lines)),
        diagnostics,
    })
}

async fn open_event_stream(
    client: reqwest::Client,
    endpoint: String,
    invocation: RunInvocation,
) -> Result<LineStream, Failure> {
    let response = client
        .post(&endpoint)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "text/event-stream")
        .json(&invocation)
        .send()
        .await
        .map_err(|e| Failure::from_transport(&e, &endpoint))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        warn!(status, %body, "AG-UI endpoint error");
        return Err(Failure::from_status(status, &body));
    }

    info!(run_id = %invocation.run_id, "Connected to AG-UI endpoint, processing events");
    Ok(Box::pin(split_lines(response.bytes_stream())))
}

struct Machine<L> {
    phase: StreamPhase,
    connect: Option<BoxFuture<'static, Result<L, Failure>>>,
    lines: Option<Pin<Box<L>>>,
    diagnostics: Arc<StreamDiagnostics>,
}

impl<L> Machine<L> {
    /// Enter `Errored`, release the connection, and render the failure.
    fn fail(&mut self, failure: Failure) -> OutputChunk {
        warn!(kind = failure.kind().as_str(), %failure, "AG-UI stream failed");
        self.diagnostics.record_failure(failure.kind());
        self.phase = StreamPhase::Errored;
        self.lines = None;
        OutputChunk::Failure(failure.render())
    }

    /// Log and count a recoverable failure and carry on; anything else
    /// fails the stream.
    fn tolerate(&mut self, failure: Failure) -> Option<OutputChunk> {
        if !failure.is_recoverable() {
            return Some(self.fail(failure));
        }
        warn!(%failure, "Skipping malformed AG-UI event");
        self.diagnostics.record_failure(failure.kind());
        None
    }

    fn finish(&mut self) {
        self.phase = StreamPhase::Finished;
        self.lines = None;
    }

    fn emit(&self, chunk: OutputChunk) -> OutputChunk {
        self.diagnostics.record_chunk();
        chunk
    }
}

fn run<L, E>(machine: Machine<L>) -> impl Stream<Item = OutputChunk>
where
    L: Stream<Item = Result<Vec<u8>, E>>,
    E: Display,
{
    futures::stream::unfold(machine, |mut m| async move {
        loop {
            match m.phase {
                StreamPhase::Connecting => {
                    let connect = m.connect.take()?;
                    match connect.await {
                        Ok(lines) => {
                            m.lines = Some(Box::pin(lines));
                            m.phase = StreamPhase::Streaming;
                        }
                        Err(failure) => {
                            let chunk = m.fail(failure);
                            let chunk = m.emit(chunk);
                            return Some((chunk, m));
                        }
                    }
                }
                StreamPhase::Streaming => {
                    let lines = m.lines.as_mut()?;
                    let line = match lines.next().await {
                        Some(Ok(line)) => line,
                        Some(Err(e)) => {
                            let chunk = m.fail(Failure::Transport(e.to_string()));
                            let chunk = m.emit(chunk);
                            return Some((chunk, m));
                        }
                        None => {
                            // No RUN_FINISHED: soft completion
                            debug!("AG-UI stream ended without RUN_FINISHED");
                            m.finish();
                            return None;
                        }
                    };

                    if line.is_empty() {
                        continue;
                    }

                    let event = match classify(&line) {
                        None => continue,
                        Some(Classification::Malformed { line, error }) => {
                            match m.tolerate(Failure::MalformedEvent { line, error }) {
                                None => continue,
                                Some(chunk) => {
                                    let chunk = m.emit(chunk);
                                    return Some((chunk, m));
                                }
                            }
                        }
                        Some(Classification::Event(event)) => event,
                    };

                    m.diagnostics.record_event();
                    if matches!(event, WireEvent::Unknown(_)) {
                        m.diagnostics.record_unknown();
                    }

                    match step(event) {
                        Step::Skip => continue,
                        Step::Emit(chunk) => {
                            let chunk = m.emit(chunk);
                            return Some((chunk, m));
                        }
                        Step::Finish => {
                            m.finish();
                            return None;
                        }
                        Step::Abort(chunk) => {
                            m.phase = StreamPhase::Errored;
                            m.lines = None;
                            let chunk = m.emit(chunk);
                            return Some((chunk, m));
                        }
                    }
                }
                StreamPhase::Finished | StreamPhase::Errored => return None,
            }
        }
    })
}
