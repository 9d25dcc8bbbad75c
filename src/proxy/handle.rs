// src/proxy/handle.rs
//! Live proxy instances
//!
//! A `ProxyHandle` is the identity-bearing runtime object returned to the
//! caller. Handles are cheap clones of a shared instance; identity is the
//! shared allocation, so reference equality is what associates a proxy with
//! its handler in the registry.
//!
//! Invocation walks the dispatch tables: native entries run directly,
//! trampolines consult the handler registry by receiver identity and fall
//! back to the displaced or inherited body on a miss. Interface proxies are
//! handler-backed by construction and carry their handler inline.

use crate::model::registry::MethodBody;
use crate::model::{TypeId, TypeRegistry};
use crate::proxy::handler::{InterceptionHandler, MethodCall};
use crate::proxy::registry::HandlerRegistry;
use crate::utils::errors::{ProxyError, Result};
use anyhow::anyhow;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Reference identity of a live proxy, used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyIdentity(usize);

pub(crate) struct ProxyInstance {
    /// Produced type (generated subtype, interface, or the original type).
    ty: TypeId,

    /// Extra capabilities carried directly on the instance (interface path).
    capabilities: Vec<TypeId>,

    types: Arc<TypeRegistry>,
    handlers: Arc<HandlerRegistry>,

    /// Interface proxies embed their handler; class proxies go through the
    /// handler registry.
    direct_handler: Option<Arc<dyn InterceptionHandler>>,

    /// Mutable field state, shared with native method bodies.
    fields: Mutex<HashMap<String, Value>>,
}

/// Identity-bearing runtime object standing in for the requested type.
#[derive(Clone)]
pub struct ProxyHandle {
    inner: Arc<ProxyInstance>,
}

impl ProxyHandle {
    pub(crate) fn new(
        types: Arc<TypeRegistry>,
        handlers: Arc<HandlerRegistry>,
        ty: TypeId,
        capabilities: Vec<TypeId>,
        fields: HashMap<String, Value>,
        direct_handler: Option<Arc<dyn InterceptionHandler>>,
    ) -> Self {
        Self {
            inner: Arc::new(ProxyInstance {
                ty,
                capabilities,
                types,
                handlers,
                direct_handler,
                fields: Mutex::new(fields),
            }),
        }
    }

    pub(crate) fn instance(&self) -> &Arc<ProxyInstance> {
        &self.inner
    }

    /// Registry key for this proxy.
    pub fn identity(&self) -> ProxyIdentity {
        ProxyIdentity(Arc::as_ptr(&self.inner) as usize)
    }

    /// Whether two handles refer to the same instance.
    pub fn ptr_eq(&self, other: &ProxyHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The produced type of this instance.
    pub fn type_id(&self) -> TypeId {
        self.inner.ty
    }

    /// Name of the produced type.
    pub fn type_name(&self) -> String {
        self.inner
            .types
            .get(self.inner.ty)
            .map(|d| d.name.clone())
            .unwrap_or_else(|_| "<unknown>".to_string())
    }

    /// Whether this instance type-checks as the given type, through its
    /// full ancestor/contract closure and its extra capabilities.
    pub fn is_instance_of(&self, ty: TypeId) -> bool {
        self.inner.types.assignable(self.inner.ty, ty)
            || self
                .inner
                .capabilities
                .iter()
                .any(|&cap| self.inner.types.assignable(cap, ty))
    }

    /// Read a field of the instance state.
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.inner.fields.lock().get(name).cloned()
    }

    /// Write a field of the instance state.
    pub fn set_field(&self, name: impl Into<String>, value: Value) {
        self.inner.fields.lock().insert(name.into(), value);
    }

    /// Invoke a method on this instance.
    ///
    /// The method is resolved over the ancestor/contract closure (and the
    /// extra capabilities), the arity is checked, then the call is dispatched:
    /// handler first where an interception trampoline is installed, original
    /// behavior otherwise.
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        let descriptor = self
            .resolve_method(method)
            .ok_or_else(|| ProxyError::Invocation {
                method: method.to_string(),
                source: anyhow!("no method '{}' on type '{}'", method, self.type_name()),
            })?;
        if args.len() != descriptor.arity {
            return Err(ProxyError::Invocation {
                method: method.to_string(),
                source: anyhow!(
                    "arity mismatch: '{}' takes {} argument(s), got {}",
                    method,
                    descriptor.arity,
                    args.len()
                ),
            });
        }

        trace!(method, ty = %self.type_name(), "invoke");

        // Interface proxies have no original behavior to fall back to.
        if let Some(handler) = &self.inner.direct_handler {
            return self.run_handler(Arc::clone(handler), method, args);
        }

        match self.inner.types.resolve_entry(self.inner.ty, method) {
            Some(MethodBody::Native(body)) => {
                body(self, args).map_err(|source| ProxyError::Invocation {
                    method: method.to_string(),
                    source,
                })
            }
            Some(MethodBody::Trampoline { fallback }) => {
                if let Some(handler) = self.inner.handlers.lookup(self) {
                    self.run_handler(handler, method, args)
                } else if let Some(body) = fallback {
                    // Handler removed or never registered for this receiver:
                    // the call falls through to original behavior.
                    body(self, args).map_err(|source| ProxyError::Invocation {
                        method: method.to_string(),
                        source,
                    })
                } else {
                    Err(ProxyError::Invocation {
                        method: method.to_string(),
                        source: anyhow!(
                            "'{}' has no handler registered and no original behavior",
                            method
                        ),
                    })
                }
            }
            None => Err(ProxyError::Invocation {
                method: method.to_string(),
                source: anyhow!("method '{}' is abstract on '{}'", method, self.type_name()),
            }),
        }
    }

    fn run_handler(
        &self,
        handler: Arc<dyn InterceptionHandler>,
        method: &str,
        args: &[Value],
    ) -> Result<Value> {
        let call = MethodCall {
            target: self.clone(),
            type_name: self.type_name(),
            method: method.to_string(),
            args: args.to_vec(),
        };
        handler.handle(call).map_err(|source| ProxyError::Invocation {
            method: method.to_string(),
            source,
        })
    }

    fn resolve_method(&self, method: &str) -> Option<crate::model::MethodDescriptor> {
        if let Some(found) = self.inner.types.resolve_method(self.inner.ty, method) {
            return Some(found);
        }
        self.inner
            .capabilities
            .iter()
            .find_map(|&cap| self.inner.types.resolve_method(cap, method))
    }
}

impl fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("type", &self.type_name())
            .field("identity", &self.identity())
            .finish()
    }
}
