//! AG-UI wire events and the per-line classifier.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Prefix of every data record in the event stream.
pub const DATA_PREFIX: &[u8] = b"data: ";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLifecycle {
    #[serde(default, deserialize_with = "lenient_text")]
    pub thread_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RunError {
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    #[serde(default, deserialize_with = "lenient_text")]
    pub message_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub delta: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default, deserialize_with = "lenient_text")]
    pub tool_call_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tool_call_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub parent_message_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub delta: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    #[serde(default, deserialize_with = "lenient_text")]
    pub message_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tool_call_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: Option<String>,
}

/// Read a text field without rejecting the event over its JSON type:
/// strings as-is, `null` as absent, anything else as compact JSON.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// One AG-UI event, keyed by its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    RunStarted(RunLifecycle),
    RunFinished(RunLifecycle),
    RunError(RunError),
    TextMessageStart(TextMessage),
    TextMessageContent(TextMessage),
    TextMessageEnd(TextMessage),
    ToolCallStart(ToolCall),
    ToolCallArgs(ToolCall),
    ToolCallEnd(ToolCall),
    ToolCallResult(ToolCallResult),
    /// A type this bridge does not know (or no type at all); carries the raw object.
    Unknown(Value),
}

impl WireEvent {
    /// Wire name of the event kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WireEvent::RunStarted(_) => "RUN_STARTED",
            WireEvent::RunFinished(_) => "RUN_FINISHED",
            WireEvent::RunError(_) => "RUN_ERROR",
            WireEvent::TextMessageStart(_) => "TEXT_MESSAGE_START",
            WireEvent::TextMessageContent(_) => "TEXT_MESSAGE_CONTENT",
            WireEvent::TextMessageEnd(_) => "TEXT_MESSAGE_END",
            WireEvent::ToolCallStart(_) => "TOOL_CALL_START",
            WireEvent::ToolCallArgs(_) => "TOOL_CALL_ARGS",
            WireEvent::ToolCallEnd(_) => "TOOL_CALL_END",
            WireEvent::ToolCallResult(_) => "TOOL_CALL_RESULT",
            WireEvent::Unknown(_) => "UNKNOWN",
        }
    }

    /// Decode a parsed JSON object into an event.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let event = match kind.as_str() {
            "RUN_STARTED" => WireEvent::RunStarted(payload(value)?),
            "RUN_FINISHED" => WireEvent::RunFinished(payload(value)?),
            "RUN_ERROR" => WireEvent::RunError(payload(value)?),
            "TEXT_MESSAGE_START" => WireEvent::TextMessageStart(payload(value)?),
            "TEXT_MESSAGE_CONTENT" => WireEvent::TextMessageContent(payload(value)?),
            "TEXT_MESSAGE_END" => WireEvent::TextMessageEnd(payload(value)?),
            "TOOL_CALL_START" => WireEvent::ToolCallStart(payload(value)?),
            "TOOL_CALL_ARGS" => WireEvent::ToolCallArgs(payload(value)?),
            "TOOL_CALL_END" => WireEvent::ToolCallEnd(payload(value)?),
            "TOOL_CALL_RESULT" => WireEvent::ToolCallResult(payload(value)?),
            _ => WireEvent::Unknown(value),
        };
        Ok(event)
    }
}

fn payload<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(value)
}

/// Outcome of classifying one data line.
///
/// Only a line whose JSON does not parse is malformed; once parsed, `type`
/// alone picks the kind and payload fields never reject the event.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Event(WireEvent),
    /// The line had the data prefix but did not decode. Recoverable.
    Malformed { line: String, error: String },
}

/// Classify one raw line of the event stream.
///
/// Returns `None` for lines that are not data records (blank lines,
/// comments, `event:`/`id:` fields).
pub fn classify(line: &[u8]) -> Option<Classification> {
    let data = line.strip_prefix(DATA_PREFIX)?;

    let parsed = serde_json::from_slice::<Value>(data).and_then(WireEvent::from_value);
    Some(match parsed {
        Ok(event) => Classification::Event(event),
        Err(e) => Classification::Malformed {
            line: String::from_utf8_lossy(line).into_owned(),
            error: e.to_string(),
        },
    })
}
