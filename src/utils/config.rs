// src/utils/config.rs
//! Engine configuration
//!
//! Controls which transformation mechanism the proxy maker wires up. The
//! inline path rewrites original method bodies in place (reversible); when
//! it is disabled the engine falls back to subclass generation, which cannot
//! intercept final methods.

use serde::{Deserialize, Serialize};

/// Configuration for the proxy construction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Enable in-place rewriting of original method bodies (default: false).
    ///
    /// When disabled, non-final classes are proxied through generated
    /// subtypes and final methods cannot be intercepted.
    pub inline_transformation: bool,

    /// Emit a warning for every final method that will not be intercepted
    /// under degraded (no-inline) mode (default: true).
    pub warn_final_methods: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            inline_transformation: false,
            warn_final_methods: true,
        }
    }
}

impl ProxyConfig {
    /// Configuration with the inline transformation path enabled.
    pub fn with_inline_transformation() -> Self {
        Self {
            inline_transformation: true,
            ..Default::default()
        }
    }
}
