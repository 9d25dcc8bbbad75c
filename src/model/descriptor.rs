// src/model/descriptor.rs
//! Type and method descriptors
//!
//! Caller-supplied, immutable metadata identifying a requested type: its
//! kind, modifiers, ancestor chain and declared method set. Descriptors are
//! built through `TypeSpec` and interned in the `TypeRegistry`, which hands
//! out copyable `TypeId` identities.

use crate::model::registry::{Constructor, NativeBody};
use crate::proxy::handle::ProxyHandle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Stable identity of an interned type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    /// Creates a type ID from a raw index.
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Kind of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    /// Concrete or abstract class with state and behavior.
    Class,

    /// Pure contract: declared methods only, no bodies, no state.
    Interface,

    /// Primitive value kind (never proxyable).
    Primitive,

    /// Array kind (never proxyable).
    Array,
}

/// A single declared method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Method name, unique within a declaring type.
    pub name: String,

    /// Number of arguments the method accepts.
    pub arity: usize,

    /// Final methods cannot be overridden by generated subtypes.
    pub is_final: bool,
}

/// Immutable description of a type: modifiers, ancestry and declared methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Registry identity of this type.
    pub id: TypeId,

    /// Fully qualified type name.
    pub name: String,

    /// Kind of the definition.
    pub kind: TypeKind,

    /// Final types cannot be extended.
    pub is_final: bool,

    /// Direct superclass, if any (the type-system root has none).
    pub superclass: Option<TypeId>,

    /// Directly implemented contracts.
    pub interfaces: Vec<TypeId>,

    /// Methods declared on this type (inherited ones live on ancestors).
    pub methods: Vec<MethodDescriptor>,
}

/// Builder for a type definition submitted to `TypeRegistry::define`.
///
/// Method bodies and the optional zero-argument constructor are carried
/// separately from the descriptor itself so the interned metadata stays
/// plain data.
pub struct TypeSpec {
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) is_final: bool,
    pub(crate) superclass: Option<TypeId>,
    pub(crate) interfaces: Vec<TypeId>,
    pub(crate) methods: Vec<MethodDescriptor>,
    pub(crate) bodies: Vec<(String, NativeBody)>,
    pub(crate) constructor: Option<Constructor>,
}

impl TypeSpec {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_final: false,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            bodies: Vec::new(),
            constructor: None,
        }
    }

    /// Start a class definition.
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    /// Start an interface definition.
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    /// Start a primitive definition.
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Primitive)
    }

    /// Mark the type as final (non-extensible).
    pub fn sealed(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Set the direct superclass. Classes default to the type-system root.
    pub fn extends(mut self, superclass: TypeId) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Add a directly implemented contract.
    pub fn implements(mut self, interface: TypeId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Declare a method without a body (abstract / contract method).
    pub fn method(mut self, name: impl Into<String>, arity: usize) -> Self {
        self.methods.push(MethodDescriptor {
            name: name.into(),
            arity,
            is_final: false,
        });
        self
    }

    /// Declare a method with a concrete body.
    pub fn method_with_body<F>(mut self, name: impl Into<String>, arity: usize, body: F) -> Self
    where
        F: Fn(&ProxyHandle, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.methods.push(MethodDescriptor {
            name: name.clone(),
            arity,
            is_final: false,
        });
        self.bodies.push((name, Arc::new(body)));
        self
    }

    /// Declare a final method with a concrete body.
    pub fn final_method<F>(mut self, name: impl Into<String>, arity: usize, body: F) -> Self
    where
        F: Fn(&ProxyHandle, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.methods.push(MethodDescriptor {
            name: name.clone(),
            arity,
            is_final: true,
        });
        self.bodies.push((name, Arc::new(body)));
        self
    }

    /// Attach a zero-argument constructor initializing field state.
    pub fn constructor<F>(mut self, ctor: F) -> Self
    where
        F: Fn(&mut std::collections::HashMap<String, Value>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.constructor = Some(Arc::new(ctor));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_roundtrip() {
        let id = TypeId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id, TypeId::new(42));
    }

    #[test]
    fn test_class_spec_defaults() {
        let spec = TypeSpec::class("Widget");
        assert_eq!(spec.kind, TypeKind::Class);
        assert!(!spec.is_final);
        assert!(spec.superclass.is_none());
        assert!(spec.methods.is_empty());
    }

    #[test]
    fn test_builder_accumulates_members() {
        let spec = TypeSpec::class("Widget")
            .sealed()
            .implements(TypeId::new(7))
            .method("render", 1)
            .method_with_body("size", 0, |_, _| Ok(serde_json::json!(0)))
            .final_method("id", 0, |_, _| Ok(serde_json::json!("w")));

        assert!(spec.is_final);
        assert_eq!(spec.interfaces, vec![TypeId::new(7)]);
        assert_eq!(spec.methods.len(), 3);
        assert_eq!(spec.bodies.len(), 2);
        assert!(spec.methods[2].is_final);
        assert_eq!(spec.methods[0].arity, 1);
    }

    #[test]
    fn test_interface_spec() {
        let spec = TypeSpec::interface("Comparable").method("compare_to", 1);
        assert_eq!(spec.kind, TypeKind::Interface);
        assert_eq!(spec.methods[0].name, "compare_to");
    }
}
