// src/model/mod.rs
//! Runtime type metadata model
//!
//! Proxies are built over an explicit type-metadata abstraction rather than
//! the host language's static types:
//!
//! - **Descriptors**: immutable `TypeDescriptor` / `MethodDescriptor` data
//!   describing kinds, modifiers and ancestry
//! - **Registry**: the process-visible type-definition state — interned
//!   descriptors plus the dispatch tables that transformation mutates

pub mod descriptor;
pub mod registry;

// Re-export commonly used types
pub use descriptor::{MethodDescriptor, TypeDescriptor, TypeId, TypeKind, TypeSpec};
pub use registry::{Constructor, MethodBody, NativeBody, TypeRegistry, WellKnownTypes};
