//! Chat-UI request → AG-UI `RunAgentInput`.

use serde::Serialize;
use serde_json::{Map, Value};

use agui_bridge_core::config::BridgeSettings;
use agui_bridge_core::ids::{new_message_id, new_run_id, new_thread_id};
use agui_bridge_core::types::{
    ChatMessage, ChatRequest, ContextItem, ForwardedProps, InvocationMessage, OriginalParams,
    RunInvocation,
};

/// Source tag recorded in the request metadata context entry.
pub const SOURCE_TAG: &str = "openwebui_pipe";

const METADATA_DESCRIPTION: &str = "OpenWebUI request metadata";

/// Snapshot of the original request carried in `context[0].value`.
#[derive(Serialize)]
struct RequestMetadata<'a> {
    original_model: Option<&'a str>,
    requested_model: &'a str,
    user_preferences: &'a Value,
    source: &'static str,
    temperature: Option<&'a Value>,
    max_tokens: Option<&'a Value>,
    stream: bool,
}

/// Build a run invocation for `request`.
///
/// Pure pass-through: nothing is rejected, an empty message list yields an
/// empty invocation message list. Every call mints fresh thread, run, and
/// message ids.
pub fn transcode(request: &ChatRequest, settings: &BridgeSettings) -> RunInvocation {
    let model = settings.models.resolve(request.model.as_deref());

    let (system, rest) = split_system_message(&request.messages);
    let messages = system
        .into_iter()
        .map(|m| InvocationMessage {
            id: new_message_id(),
            role: "system".to_string(),
            content: m.content.clone(),
        })
        .chain(rest.into_iter().map(|m| InvocationMessage {
            id: new_message_id(),
            role: m.role.clone(),
            content: m.content.clone(),
        }))
        .collect();

    let empty_preferences = Value::Object(Map::new());
    let metadata = RequestMetadata {
        original_model: request.model.as_deref(),
        requested_model: &model,
        user_preferences: request.user.as_ref().unwrap_or(&empty_preferences),
        source: SOURCE_TAG,
        temperature: request.temperature.as_ref(),
        max_tokens: request.max_tokens.as_ref(),
        stream: request.wants_stream(),
    };
    // Serializing a struct of plain fields cannot fail.
    let metadata = serde_json::to_string(&metadata).unwrap_or_default();

    RunInvocation {
        thread_id: new_thread_id(&settings.thread_id_prefix),
        run_id: new_run_id(),
        state: Map::new(),
        messages,
        tools: Vec::new(),
        context: vec![ContextItem {
            description: METADATA_DESCRIPTION.to_string(),
            value: metadata,
        }],
        forwarded_props: ForwardedProps {
            openwebui_request: true,
            model,
            original_params: original_params(request),
        },
    }
}

/// Sampling parameters copied verbatim, absence included.
pub fn original_params(request: &ChatRequest) -> OriginalParams {
    OriginalParams {
        temperature: request.temperature.clone(),
        top_p: request.top_p.clone(),
        top_k: request.top_k.clone(),
        stop: request.stop.clone(),
        stream: request.stream,
        max_tokens: request.max_tokens.clone(),
    }
}

/// Pull the first system message out of `messages`, wherever it sits.
/// Every other system message is dropped from the rest.
fn split_system_message(messages: &[ChatMessage]) -> (Option<&ChatMessage>, Vec<&ChatMessage>) {
    let system = messages.iter().find(|m| m.is_system());
    let rest = messages.iter().filter(|m| !m.is_system()).collect();
    (system, rest)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use agui_bridge_core::models::ModelMapping;
    use agui_bridge_core::types::ModelEntry;
    use serde_json::json;

    fn settings() -> BridgeSettings {
        BridgeSettings {
            thread_id_prefix: "testui".into(),
            models: ModelMapping::new(
                vec![
                    ModelEntry::new("agui-agent"),
                    ModelEntry {
                        target: Some("gpt-4o-mini".into()),
                        ..ModelEntry::new("openaigpt4omini")
                    },
                ],
                "agui-agent",
            ),
            ..BridgeSettings::for_endpoint("http://localhost:8000")
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage::new("system", "You are a helpful assistant."),
                ChatMessage::new("user", "Hello! Can you explain what AG-UI is?"),
            ],
            model: Some("aguimiddleware.openaigpt4omini".into()),
            temperature: Some(json!(0.8)),
            max_tokens: Some(json!(1000)),
            stream: Some(true),
            top_p: Some(json!(0.9)),
            ..ChatRequest::default()
        }
    }

    #[test]
    fn test_basic_shape() {
        let inv = transcode(&request(), &settings());
        assert!(inv.thread_id.starts_with("testui_"));
        assert!(inv.run_id.starts_with("run_"));
        assert!(inv.state.is_empty());
        assert!(inv.tools.is_empty());
        assert_eq!(inv.messages.len(), 2);
        assert_eq!(inv.messages[0].role, "system");
        assert_eq!(inv.messages[1].role, "user");
        assert_eq!(inv.forwarded_props.model, "gpt-4o-mini");
        assert!(inv.forwarded_props.openwebui_request);
    }

    #[test]
    fn test_ids_are_fresh_per_call() {
        let req = request();
        let a = transcode(&req, &settings());
        let b = transcode(&req, &settings());
        assert_ne!(a.thread_id, b.thread_id);
        assert_ne!(a.run_id, b.run_id);

        let ids: HashSet<&str> = a
            .messages
            .iter()
            .chain(b.messages.iter())
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_system_message_is_hoisted_once() {
        let req = ChatRequest {
            messages: vec![
                ChatMessage::new("user", "first"),
                ChatMessage::new("assistant", "second"),
                ChatMessage::new("system", "rules"),
                ChatMessage::new("user", "third"),
            ],
            ..ChatRequest::default()
        };
        let inv = transcode(&req, &settings());
        let roles: Vec<&str> = inv.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(inv.messages[0].content, json!("rules"));
        let contents: Vec<&Value> = inv.messages.iter().map(|m| &m.content).collect();
        assert_eq!(
            contents,
            vec![&json!("rules"), &json!("first"), &json!("second"), &json!("third")]
        );
    }

    #[test]
    fn test_later_system_messages_are_dropped() {
        let req = ChatRequest {
            messages: vec![
                ChatMessage::new("system", "A"),
                ChatMessage::new("user", "u"),
                ChatMessage::new("system", "B"),
            ],
            ..ChatRequest::default()
        };
        let inv = transcode(&req, &settings());
        let pairs: Vec<(&str, &Value)> = inv
            .messages
            .iter()
            .map(|m| (m.role.as_str(), &m.content))
            .collect();
        assert_eq!(pairs, vec![("system", &json!("A")), ("user", &json!("u"))]);
    }

    #[test]
    fn test_empty_request_is_not_an_error() {
        let inv = transcode(&ChatRequest::default(), &settings());
        assert!(inv.messages.is_empty());
        assert_eq!(inv.forwarded_props.model, "agui-agent");
    }

    #[test]
    fn test_unmapped_model_uses_default() {
        let req = ChatRequest {
            model: Some("aguimiddleware.does-not-exist".into()),
            ..ChatRequest::default()
        };
        assert_eq!(transcode(&req, &settings()).forwarded_props.model, "agui-agent");
    }

    #[test]
    fn test_context_metadata() {
        let req = ChatRequest {
            user: Some(json!({"name": "ada", "role": "admin"})),
            stream: None,
            ..request()
        };
        let inv = transcode(&req, &settings());
        assert_eq!(inv.context.len(), 1);
        assert_eq!(inv.context[0].description, "OpenWebUI request metadata");

        let meta: Value = serde_json::from_str(&inv.context[0].value).unwrap();
        assert_eq!(meta["original_model"], "aguimiddleware.openaigpt4omini");
        assert_eq!(meta["requested_model"], "gpt-4o-mini");
        assert_eq!(meta["user_preferences"], json!({"name": "ada", "role": "admin"}));
        assert_eq!(meta["source"], "openwebui_pipe");
        assert_eq!(meta["temperature"], json!(0.8));
        assert_eq!(meta["max_tokens"], json!(1000));
        // absent stream flag defaults to true in metadata
        assert_eq!(meta["stream"], json!(true));
    }

    #[test]
    fn test_context_metadata_defaults() {
        let inv = transcode(&ChatRequest::default(), &settings());
        let meta: Value = serde_json::from_str(&inv.context[0].value).unwrap();
        assert!(meta["original_model"].is_null());
        assert_eq!(meta["user_preferences"], json!({}));
        assert!(meta["temperature"].is_null());
    }

    #[test]
    fn test_original_params_pass_through_exactly() {
        let req = ChatRequest {
            temperature: Some(json!(0.1)),
            top_p: None,
            top_k: Some(json!(40)),
            stop: Some(json!(["\n\n"])),
            stream: None,
            max_tokens: Some(json!(256)),
            ..ChatRequest::default()
        };
        let inv = transcode(&req, &settings());
        let params = &inv.forwarded_props.original_params;
        assert_eq!(params.temperature, Some(json!(0.1)));
        assert_eq!(params.top_p, None);
        assert_eq!(params.top_k, Some(json!(40)));
        assert_eq!(params.stop, req.stop);
        assert_eq!(params.stream, None);
        assert_eq!(params.max_tokens, Some(json!(256)));

        let wire = serde_json::to_value(&inv).unwrap();
        let wire_params = &wire["forwardedProps"]["original_params"];
        assert_eq!(wire_params["temperature"], json!(0.1));
        assert!(wire_params["top_p"].is_null());
        assert!(wire_params["stream"].is_null());
        assert_eq!(wire_params["stop"], json!(["\n\n"]));
    }

    #[test]
    fn test_unusual_numeric_params_are_forwarded_verbatim() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"messages":[],"temperature":1,"top_k":40.0,"max_tokens":-1}"#,
        )
        .unwrap();
        let inv = transcode(&req, &settings());
        let wire = serde_json::to_value(&inv).unwrap();
        let params = &wire["forwardedProps"]["original_params"];
        assert_eq!(serde_json::to_string(&params["temperature"]).unwrap(), "1");
        assert_eq!(serde_json::to_string(&params["top_k"]).unwrap(), "40.0");
        assert_eq!(serde_json::to_string(&params["max_tokens"]).unwrap(), "-1");

        let meta: Value = serde_json::from_str(&inv.context[0].value).unwrap();
        assert_eq!(serde_json::to_string(&meta["temperature"]).unwrap(), "1");
        assert_eq!(serde_json::to_string(&meta["max_tokens"]).unwrap(), "-1");
    }

    #[test]
    fn test_structured_content_passes_through() {
        let parts = json!([{"type": "text", "text": "look"}, {"type": "image_url", "image_url": {"url": "x"}}]);
        let req = ChatRequest {
            messages: vec![ChatMessage {
                role: "user".into(),
                content: parts.clone(),
            }],
            ..ChatRequest::default()
        };
        let inv = transcode(&req, &settings());
        assert_eq!(inv.messages[0].content, parts);
    }
}
