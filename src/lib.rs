// src/lib.rs
//! Proxylab Runtime Proxy Construction Engine
//!
//! This library creates, at run time, substitute objects ("proxies") that
//! stand in for a requested type and redirect every method invocation to a
//! caller-supplied interception handler.
//!
//! # Architecture
//!
//! The engine is structured into several key modules:
//!
//! - **model**: runtime type metadata — descriptors, the type registry and
//!   the dispatch tables transformation operates on
//! - **proxy**: the maker orchestrator, live proxy handles, the handler
//!   contract, the weak-keyed handler registry and cancelable results
//! - **transform**: the transformation gateway with its inline-rewrite and
//!   subclass-generation collaborators
//! - **utils**: error taxonomy and engine configuration
//!
//! # Example
//!
//! ```
//! use proxylab::{ProxyConfig, ProxyMaker, ProxyOptions, TypeRegistry, TypeSpec};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let types = TypeRegistry::new();
//! let widget = types
//!     .define(
//!         TypeSpec::class("Widget")
//!             .method_with_body("size", 0, |_, _| Ok(json!(3)))
//!             .constructor(|_| Ok(())),
//!     )
//!     .unwrap();
//!
//! let maker = ProxyMaker::new(Arc::clone(&types), ProxyConfig::default());
//! let result = maker
//!     .create_proxy(
//!         widget,
//!         &[],
//!         Arc::new(|call: proxylab::MethodCall| Ok(json!(format!("mocked:{}", call.method)))),
//!         ProxyOptions::default().with_default_constructor(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(result.value().invoke("size", &[]).unwrap(), json!("mocked:size"));
//! result.cancel();
//! ```

// Public module exports
pub mod model;
pub mod proxy;
pub mod transform;
pub mod utils;

// Re-export commonly used types
pub use model::{
    MethodBody, MethodDescriptor, TypeDescriptor, TypeId, TypeKind, TypeRegistry, TypeSpec,
};
pub use proxy::{
    Cancelable, HandlerRegistry, InterceptionHandler, Instantiator, MethodCall, ProxyHandle,
    ProxyIdentity, ProxyMaker, ProxyOptions, Reversal, ZeroedInstantiator,
};
pub use transform::{
    InlineInstrumentation, RegistryInliner, RegistrySubclasser, SubclassInstrumentation,
    TransformationGateway, TransformationKind,
};
pub use utils::config::ProxyConfig;
pub use utils::errors::{NotProxyableReason, ProxyError, Result};

// Re-export the value type handlers exchange
pub use serde_json::Value;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
