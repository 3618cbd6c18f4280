//! Configuration loading, environment overrides, and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::ModelMapping;
use crate::types::ModelEntry;

pub const DEFAULT_ENDPOINT_URL: &str = "http://host.docker.internal:8000";
pub const DEFAULT_THREAD_ID_PREFIX: &str = "openwebui";
pub const DEFAULT_MODEL: &str = "agui-agent";

/// Environment variables that override the config file.
pub const ENV_ENDPOINT_URL: &str = "AG_UI_ENDPOINT_URL";
pub const ENV_THREAD_ID_PREFIX: &str = "THREAD_ID_PREFIX";
pub const ENV_DEFAULT_MODEL: &str = "DEFAULT_MODEL";

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipe: Option<PipeConfig>,

    /// Models advertised to the chat UI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<ModelEntry>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Where the AG-UI agent lives and how long to wait for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,

    /// Maximum silence between two reads of the response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id_prefix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

fn default_gateway_port() -> u16 {
    18790
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "agui_bridge_transcoder=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

/// Everything the transcoders need, resolved once from [`Config`].
///
/// Immutable and cheap to share, so concurrent invocations never touch
/// process-wide state.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub endpoint_url: String,
    pub thread_id_prefix: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub models: ModelMapping,
}

impl BridgeSettings {
    /// Settings pointing at `endpoint_url` with every other value defaulted.
    pub fn for_endpoint(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Config::default().bridge_settings()
    }
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references
    /// and applying the environment overrides.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(crate::error::BridgeError::Io)?;

            // Substitute ${ENV_VAR} references before parsing
            let substituted = substitute_env_vars(&raw);

            json5::from_str::<Config>(&substituted)
                .map_err(|e| crate::error::BridgeError::Config(e.to_string()))?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides for the endpoint URL, thread prefix, and default model.
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = lookup(ENV_ENDPOINT_URL) {
            debug!(%url, "Endpoint URL overridden from {ENV_ENDPOINT_URL}");
            self.endpoint.get_or_insert_with(EndpointConfig::default).url = Some(url);
        }
        if let Some(prefix) = lookup(ENV_THREAD_ID_PREFIX) {
            self.pipe.get_or_insert_with(PipeConfig::default).thread_id_prefix = Some(prefix);
        }
        if let Some(model) = lookup(ENV_DEFAULT_MODEL) {
            self.pipe.get_or_insert_with(PipeConfig::default).default_model = Some(model);
        }
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .as_ref()
            .and_then(|e| e.url.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_string())
    }

    pub fn connect_timeout(&self) -> Duration {
        let ms = self
            .endpoint
            .as_ref()
            .and_then(|e| e.connect_timeout_ms)
            .unwrap_or(3_000);
        Duration::from_millis(ms)
    }

    pub fn read_timeout(&self) -> Duration {
        let ms = self
            .endpoint
            .as_ref()
            .and_then(|e| e.read_timeout_ms)
            .unwrap_or(60_000);
        Duration::from_millis(ms)
    }

    pub fn thread_id_prefix(&self) -> String {
        self.pipe
            .as_ref()
            .and_then(|p| p.thread_id_prefix.clone())
            .unwrap_or_else(|| DEFAULT_THREAD_ID_PREFIX.to_string())
    }

    pub fn default_model(&self) -> String {
        self.pipe
            .as_ref()
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// Advertised model catalog; a single `agui-agent` entry when unset.
    pub fn model_catalog(&self) -> Vec<ModelEntry> {
        match &self.models {
            Some(models) if !models.is_empty() => models.clone(),
            _ => vec![ModelEntry::new(DEFAULT_MODEL)],
        }
    }

    /// Gateway port.
    pub fn gateway_port(&self) -> u16 {
        self.gateway
            .as_ref()
            .map(|g| g.port)
            .unwrap_or_else(default_gateway_port)
    }

    pub fn gateway_bind(&self) -> String {
        self.gateway
            .as_ref()
            .and_then(|g| g.bind.clone())
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    /// Resolve the settings handed to the transcoders.
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            endpoint_url: self.endpoint_url(),
            thread_id_prefix: self.thread_id_prefix(),
            connect_timeout: self.connect_timeout(),
            read_timeout: self.read_timeout(),
            models: ModelMapping::new(self.model_catalog(), self.default_model()),
        }
    }

    /// Get a config value by dotted path (e.g. "gateway.port", "endpoint.url").
    pub fn get_path(&self, path: &str) -> Option<serde_json::Value> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        let url = self.endpoint_url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("Endpoint URL must be http(s): {url}"));
        }

        if self.connect_timeout().is_zero() {
            errors.push("Endpoint connect timeout cannot be 0".to_string());
        }
        if self.read_timeout().is_zero() {
            errors.push("Endpoint read timeout cannot be 0".to_string());
        }

        let default_model = self.default_model();
        if !self.model_catalog().iter().any(|m| m.id == default_model) {
            warnings.push(format!(
                "Default model '{default_model}' is not in the advertised model list"
            ));
        }

        if let Some(gw) = &self.gateway {
            if gw.port == 0 {
                errors.push("Gateway port cannot be 0".to_string());
            }
        }

        (warnings, errors)
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Base directory for bridge data: `~/.agui_bridge/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".agui_bridge")
}
