//! Units of chat-visible output produced by the stream transcoder.

use std::fmt;

/// One piece of text the chat UI appends to the assistant message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    /// Assistant text delta, verbatim.
    Content(String),
    /// A tool call began.
    ToolCallStarted { name: String },
    /// Streaming tool-call argument text, verbatim.
    ToolCallArgs(String),
    /// A tool call's arguments are complete.
    ToolCallEnded,
    /// A tool produced a result.
    ToolResult(String),
    /// The agent reported a run error.
    RunError(String),
    /// A boundary failure, already rendered.
    Failure(String),
}

impl fmt::Display for OutputChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputChunk::Content(text) | OutputChunk::ToolCallArgs(text) => f.write_str(text),
            OutputChunk::ToolCallStarted { name } => {
                write!(f, "\n**🔧 Calling tool: `{name}`**\n")
            }
            OutputChunk::ToolCallEnded => f.write_str("\n"),
            OutputChunk::ToolResult(result) => {
                write!(f, "**📋 Tool result:**\n```\n{result}\n```\n\n")
            }
            OutputChunk::RunError(message) => write!(f, "Error from AG-UI endpoint: {message}"),
            OutputChunk::Failure(text) => f.write_str(text),
        }
    }
}

impl From<OutputChunk> for String {
    fn from(chunk: OutputChunk) -> Self {
        match chunk {
            OutputChunk::Content(text) | OutputChunk::ToolCallArgs(text) => text,
            OutputChunk::Failure(text) => text,
            other => other.to_string(),
        }
    }
}
