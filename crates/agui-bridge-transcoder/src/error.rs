//! Boundary failures and how they are shown to the chat UI.
//!
//! Every failure that reaches the caller is rendered as plain text so the
//! chat UI can display it as assistant output.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// One entry of a 422 validation response (`{"loc": [...], "msg": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ValidationEntry {
    #[serde(default)]
    loc: Vec<Value>,
    #[serde(default)]
    msg: Option<String>,
}

impl From<ValidationEntry> for FieldError {
    fn from(entry: ValidationEntry) -> Self {
        let field = entry
            .loc
            .iter()
            .map(|part| match part {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        Self {
            field,
            message: entry.msg.unwrap_or_else(|| "Unknown error".to_string()),
        }
    }
}

/// Broad failure category, used for counters and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connection,
    HttpStatus,
    Validation,
    MalformedEvent,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Connection => "connection",
            FailureKind::HttpStatus => "http_status",
            FailureKind::Validation => "validation",
            FailureKind::MalformedEvent => "malformed_event",
            FailureKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Error)]
pub enum Failure {
    /// The endpoint could not be reached at all.
    #[error("Failed to connect to AG-UI endpoint at {endpoint}. Please check if the AG-UI endpoint is running.")]
    Unreachable { endpoint: String },

    /// The request or the response body failed in transit (including timeouts).
    #[error("Failed to connect to AG-UI endpoint: {0}")]
    Transport(String),

    #[error("AG-UI endpoint returned {status}: {detail}")]
    HttpStatus { status: u16, detail: String },

    #[error("Validation Error: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// A single undecodable stream line. Never aborts a stream.
    #[error("Failed to parse AG-UI event: {line} - {error}")]
    MalformedEvent { line: String, error: String },

    #[error("{0}")]
    Unknown(String),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Failure {
    /// Classify a non-2xx response. 422 bodies holding a list of
    /// `{loc, msg}` entries become field-level validation errors.
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == 422 {
            if let Ok(entries) = serde_json::from_str::<Vec<ValidationEntry>>(body) {
                return Failure::Validation(entries.into_iter().map(FieldError::from).collect());
            }
        }
        Failure::HttpStatus {
            status,
            detail: body.to_string(),
        }
    }

    /// Classify a `reqwest` error raised while talking to `endpoint`.
    pub fn from_transport(error: &reqwest::Error, endpoint: &str) -> Self {
        if error.is_connect() {
            Failure::Unreachable {
                endpoint: endpoint.to_string(),
            }
        } else {
            Failure::Transport(error.to_string())
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Unreachable { .. } | Failure::Transport(_) => FailureKind::Connection,
            Failure::HttpStatus { .. } => FailureKind::HttpStatus,
            Failure::Validation(_) => FailureKind::Validation,
            Failure::MalformedEvent { .. } => FailureKind::MalformedEvent,
            Failure::Unknown(_) => FailureKind::Unknown,
        }
    }

    /// Whether the stream may continue past this failure.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == FailureKind::MalformedEvent
    }

    /// Text shown to the chat UI.
    pub fn render(&self) -> String {
        match self {
            Failure::Validation(_) => self.to_string(),
            _ => format!("Error: {self}"),
        }
    }
}
