// src/utils/mod.rs
//! Common utilities: error taxonomy and engine configuration.

pub mod config;
pub mod errors;

pub use config::ProxyConfig;
pub use errors::{NotProxyableReason, ProxyError, Result};
