//! HTTP gateway for the AG-UI pipe.
//!
//! Exposes a [`ChatPipe`](agui_bridge_transcoder::ChatPipe) to chat UIs over
//! plain HTTP: `/models` lists the catalog, `/pipe` takes a chat request and
//! answers with text, streamed chunk by chunk when the request asks for it.

#[cfg(feature = "metrics")]
pub mod metrics;
pub mod server;
pub mod state;

pub use server::{router, start_gateway};
pub use state::GatewayState;
