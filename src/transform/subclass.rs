// src/transform/subclass.rs
//! Subclass generation
//!
//! Synthesizes a new type extending the original and implementing each extra
//! capability, with every overridable method overridden by an interception
//! trampoline. Unlike the inline path this is not reversible as a unit — the
//! generated type persists — but it needs no cooperation from the original
//! definition.

use crate::model::registry::MethodBody;
use crate::model::{TypeDescriptor, TypeSpec};
use crate::model::TypeRegistry;
use crate::proxy::handle::ProxyHandle;
use crate::proxy::handler::InterceptionHandler;
use crate::proxy::registry::HandlerRegistry;
use anyhow::{anyhow, bail};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

static NEXT_PROXY_TYPE: AtomicU32 = AtomicU32::new(0);

/// Collaborator generating interceptable subtypes and wiring produced
/// instances to their dispatch mechanism.
pub trait SubclassInstrumentation: Send + Sync {
    /// Synthesize a type extending `original` and implementing each
    /// capability, with overridable methods dispatching through the handler
    /// lookup.
    fn subclass(
        &self,
        original: &Arc<TypeDescriptor>,
        capabilities: &[Arc<TypeDescriptor>],
    ) -> anyhow::Result<Arc<TypeDescriptor>>;

    /// Wire a produced instance to its interception handler.
    fn bind_handler(
        &self,
        instance: &ProxyHandle,
        handler: Arc<dyn InterceptionHandler>,
    ) -> anyhow::Result<()>;
}

/// Default subclassing collaborator working directly on the type registry.
pub struct RegistrySubclasser {
    types: Arc<TypeRegistry>,
    handlers: Arc<HandlerRegistry>,
}

impl RegistrySubclasser {
    pub fn new(types: Arc<TypeRegistry>, handlers: Arc<HandlerRegistry>) -> Self {
        Self { types, handlers }
    }

    /// Reject member sets where the same name resolves to different arities
    /// across the original type and the capability contracts.
    fn check_ambiguity(
        &self,
        original: &TypeDescriptor,
        capabilities: &[Arc<TypeDescriptor>],
    ) -> anyhow::Result<()> {
        let mut arities: HashMap<String, usize> = HashMap::new();
        for method in self.types.method_set(original.id) {
            arities.insert(method.name, method.arity);
        }
        for capability in capabilities {
            for method in self.types.method_set(capability.id) {
                if let Some(&existing) = arities.get(&method.name) {
                    if existing != method.arity {
                        bail!(
                            "ambiguous member '{}': arity {} on '{}' conflicts with arity {}",
                            method.name,
                            method.arity,
                            capability.name,
                            existing
                        );
                    }
                } else {
                    arities.insert(method.name, method.arity);
                }
            }
        }
        Ok(())
    }
}

impl SubclassInstrumentation for RegistrySubclasser {
    fn subclass(
        &self,
        original: &Arc<TypeDescriptor>,
        capabilities: &[Arc<TypeDescriptor>],
    ) -> anyhow::Result<Arc<TypeDescriptor>> {
        if original.is_final {
            bail!("type '{}' is final and cannot be extended", original.name);
        }
        self.check_ambiguity(original, capabilities)?;

        let name = format!(
            "{}$Proxy{}",
            original.name,
            NEXT_PROXY_TYPE.fetch_add(1, Ordering::Relaxed)
        );
        let mut spec = TypeSpec::class(&name).extends(original.id);
        for capability in capabilities {
            spec = spec.implements(capability.id);
        }
        let generated = self
            .types
            .define(spec)
            .map_err(|e| anyhow!("failed to intern generated type '{}': {}", name, e))?;

        // Override every overridable inherited or contract-declared method
        // with a trampoline; the behavior a plain call would have run stays
        // available as the fallback.
        let mut overridden = 0usize;
        for method in self.types.method_set(original.id) {
            if method.is_final {
                trace!(ty = %original.name, method = %method.name, "final method left unoverridden");
                continue;
            }
            let fallback = self.types.resolve_native(original.id, &method.name);
            self.types.install_body(
                generated,
                &method.name,
                MethodBody::Trampoline { fallback },
            );
            overridden += 1;
        }
        for capability in capabilities {
            for method in self.types.method_set(capability.id) {
                if self.types.body(generated, &method.name).is_some() {
                    continue;
                }
                self.types.install_body(
                    generated,
                    &method.name,
                    MethodBody::Trampoline { fallback: None },
                );
                overridden += 1;
            }
        }

        debug!(original = %original.name, generated = %name, overridden, "generated subclass");
        self.types.get(generated).map_err(|e| anyhow!(e))
    }

    fn bind_handler(
        &self,
        instance: &ProxyHandle,
        handler: Arc<dyn InterceptionHandler>,
    ) -> anyhow::Result<()> {
        self.handlers.register(instance, handler);
        Ok(())
    }
}
