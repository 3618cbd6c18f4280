use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Front protocol (chat UI pipe) ---

/// A chat message as sent by the chat UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "default_role")]
    pub role: String,
    /// Plain text, or a structured (multimodal) payload passed through untouched.
    #[serde(default = "default_content")]
    pub content: Value,
}

fn default_role() -> String {
    "user".into()
}

fn default_content() -> Value {
    Value::String(String::new())
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Value::String(content.into()),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// A chat completion request from the chat UI.
///
/// Every field is optional on the wire; absent values default instead of
/// failing the request. Sampling parameters are kept as raw JSON so they
/// can be forwarded exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<Value>,
    /// One string or a list of strings; not interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Opaque user preferences, forwarded as request metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

impl ChatRequest {
    /// Whether the caller wants a token stream. Absent means yes.
    pub fn wants_stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }
}

// --- Back protocol (AG-UI run input) ---

/// A message inside a run invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationMessage {
    pub id: String,
    pub role: String,
    pub content: Value,
}

/// A context entry. `value` is always a serialized JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub description: String,
    pub value: String,
}

/// Sampling parameters exactly as received; absent values serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginalParams {
    pub temperature: Option<Value>,
    pub top_p: Option<Value>,
    pub top_k: Option<Value>,
    pub stop: Option<Value>,
    pub stream: Option<bool>,
    pub max_tokens: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardedProps {
    pub openwebui_request: bool,
    pub model: String,
    pub original_params: OriginalParams,
}

/// The AG-UI `RunAgentInput` payload POSTed to the agent endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInvocation {
    pub thread_id: String,
    pub run_id: String,
    pub state: Map<String, Value>,
    pub messages: Vec<InvocationMessage>,
    pub tools: Vec<Value>,
    pub context: Vec<ContextItem>,
    pub forwarded_props: ForwardedProps,
}

impl RunInvocation {
    /// Ask the agent for a single JSON response instead of an event stream.
    pub fn request_non_streaming(&mut self) {
        self.state.insert("stream".into(), Value::Bool(false));
    }
}

/// A model advertised to the chat UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    /// Agent-side model name; defaults to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl ModelEntry {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            target: None,
        }
    }

    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.id)
    }
}
