// src/proxy/mod.rs
//! Proxy construction and interception
//!
//! This module provides the caller-facing half of the engine:
//!
//! - **Maker**: orchestrates eligibility, path selection and assembly
//! - **Handle**: the identity-bearing runtime object standing in for a type
//! - **Handler**: the contract intercepted calls are routed through
//! - **Registry**: weak-keyed identity-to-handler map
//! - **Instantiate**: construction strategies that never run arbitrary
//!   user constructors
//! - **Cancel**: idempotent reversal of a proxy's side effects
//!
//! # Architecture
//!
//! ```text
//! create_proxy(type, capabilities, handler, options)
//!     │
//!     ├─ Interface type → handler-backed proxy (nothing to cancel)
//!     └─ Class type → transformation gateway → instantiation
//!                           │                       │
//!                           └── reversal ──┐        │
//!                                          ▼        ▼
//!                               Cancelable(ProxyHandle)
//! ```

pub mod cancel;
pub mod handle;
pub mod handler;
pub mod instantiate;
pub mod maker;
pub mod registry;

// Re-export commonly used types
pub use cancel::{Cancelable, Reversal};
pub use handle::{ProxyHandle, ProxyIdentity};
pub use handler::{InterceptionHandler, MethodCall};
pub use instantiate::{Instantiator, ProxyOptions, ZeroedInstantiator};
pub use maker::ProxyMaker;
pub use registry::HandlerRegistry;
