//! Model catalog and chat-UI → agent model id mapping.

use std::collections::HashMap;

use crate::types::ModelEntry;

/// Separator the chat UI puts between the pipe id and the model id
/// (e.g. `aguimiddleware.agui-agent`).
pub const MODEL_ID_SEPARATOR: char = '.';

/// Static mapping from UI-safe model ids to agent model names.
#[derive(Debug, Clone)]
pub struct ModelMapping {
    catalog: Vec<ModelEntry>,
    targets: HashMap<String, String>,
    default_model: String,
}

impl ModelMapping {
    pub fn new(catalog: Vec<ModelEntry>, default_model: impl Into<String>) -> Self {
        let targets = catalog
            .iter()
            .map(|m| (m.id.clone(), m.target().to_string()))
            .collect();
        Self {
            catalog,
            targets,
            default_model: default_model.into(),
        }
    }

    /// Models advertised to the chat UI.
    pub fn catalog(&self) -> &[ModelEntry] {
        &self.catalog
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Resolve the agent model for a requested model string.
    ///
    /// With a separator, only the part after the first separator is looked
    /// up; without one, the whole string is. Unmapped or absent ids resolve
    /// to the default model.
    pub fn resolve(&self, requested: Option<&str>) -> String {
        let Some(requested) = requested else {
            return self.default_model.clone();
        };
        let key = match requested.split_once(MODEL_ID_SEPARATOR) {
            Some((_, model_id)) => model_id,
            None => requested,
        };
        self.targets
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.default_model.clone())
    }
}

impl Default for ModelMapping {
    fn default() -> Self {
        Self::new(vec![ModelEntry::new("agui-agent")], "agui-agent")
    }
}
