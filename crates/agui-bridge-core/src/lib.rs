//! Core types, config, errors, and identifiers for the AG-UI bridge.

pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod types;
