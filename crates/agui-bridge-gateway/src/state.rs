//! Gateway shared state.

use std::sync::Arc;

use agui_bridge_core::config::Config;
use agui_bridge_transcoder::ChatPipe;

/// Shared gateway state accessible from all handlers.
pub struct GatewayState {
    pub config: Arc<Config>,
    pub pipe: Arc<dyn ChatPipe>,
    #[cfg(feature = "metrics")]
    pub metrics: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl GatewayState {
    pub fn new(config: Arc<Config>, pipe: Arc<dyn ChatPipe>) -> Self {
        Self {
            config,
            pipe,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Serve `/metrics` from this Prometheus handle.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, handle: metrics_exporter_prometheus::PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Address the server binds to (`gateway.bind`, default 127.0.0.1).
    pub fn bind_addr(&self) -> String {
        self.config.gateway_bind()
    }
}
