//! Non-streaming call: one JSON request, one text reply.

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};

use agui_bridge_core::types::RunInvocation;

use crate::diagnostics::StreamDiagnostics;
use crate::error::Failure;

/// Fields tried, in order, when pulling a reply out of a JSON body.
const RESULT_FIELDS: [&str; 4] = ["content", "message", "text", "result"];

#[derive(Clone)]
pub struct UnaryTranscoder {
    client: reqwest::Client,
    endpoint: String,
    diagnostics: Arc<StreamDiagnostics>,
}

impl UnaryTranscoder {
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

    /// Run the agent once and return its reply, or a rendered failure.
    pub async fn invoke(&self, mut invocation: RunInvocation) -> String {
        self.diagnostics.record_run();
        invocation.request_non_streaming();

        match self.call(&invocation).await {
            Ok(text) => text,
            Err(failure) => {
                warn!(kind = failure.kind().as_str(), %failure, "AG-UI request failed");
                self.diagnostics.record_failure(failure.kind());
                failure.render()
            }
        }
    }

    async fn call(&self, invocation: &RunInvocation) -> Result<String, Failure> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(invocation)
            .send()
            .await
            .map_err(|e| Failure::from_transport(&e, &self.endpoint))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Failure::from_transport(&e, &self.endpoint))?;

        if !status.is_success() {
            return Err(Failure::from_status(status.as_u16(), &body));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            Failure::Unknown(format!("Invalid JSON from AG-UI endpoint: {e}"))
        })?;
        debug!(run_id = %invocation.run_id, "Received non-streaming reply");
        Ok(extract_result(&value))
    }
}

/// Pick the reply text out of a JSON body.
///
/// The first present field among `content`, `message`, `text`, `result`
/// wins: strings verbatim, `null` as empty, anything else as compact JSON.
/// With none present the whole body is pretty-printed.
pub fn extract_result(body: &Value) -> String {
    let Some(object) = body.as_object() else {
        return render_value(body);
    };

    RESULT_FIELDS
        .iter()
        .find_map(|field| object.get(*field))
        .map(render_value)
        .unwrap_or_else(|| serde_json::to_string_pretty(body).unwrap_or_default())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
