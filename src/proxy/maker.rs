// src/proxy/maker.rs
//! Proxy maker (orchestrator)
//!
//! Validates eligibility, picks a construction path, drives transformation
//! and instantiation, binds the handler and returns a cancelable handle:
//!
//! ```text
//! create_proxy
//!     ├─ eligibility check (fail fast, nothing mutated)
//!     ├─ interface? → handler-backed proxy, no-op reversal
//!     ├─ transformation gateway → reversal
//!     ├─ final? type itself : generated subtype
//!     ├─ instantiation strategy
//!     └─ bind handler → Cancelable(proxy, remove entry + undo transform)
//! ```
//!
//! A failed creation leaves no residual type mutation: the transformation
//! reversal runs before any phase error is surfaced.

use crate::model::{TypeDescriptor, TypeId, TypeKind, TypeRegistry};
use crate::proxy::cancel::{Cancelable, Reversal};
use crate::proxy::handle::ProxyHandle;
use crate::proxy::handler::InterceptionHandler;
use crate::proxy::instantiate::{instantiate, Instantiator, ProxyOptions, ZeroedInstantiator};
use crate::proxy::registry::HandlerRegistry;
use crate::transform::{
    InlineInstrumentation, RegistryInliner, RegistrySubclasser, TransformationGateway,
};
use crate::utils::config::ProxyConfig;
use crate::utils::errors::{NotProxyableReason, ProxyError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrator turning a proxy request into a cancelable live proxy.
pub struct ProxyMaker {
    types: Arc<TypeRegistry>,
    handlers: Arc<HandlerRegistry>,
    gateway: TransformationGateway,
    instantiator: Arc<dyn Instantiator>,
}

impl ProxyMaker {
    /// Maker bound to the process-wide handler registry.
    pub fn new(types: Arc<TypeRegistry>, config: ProxyConfig) -> Self {
        Self::with_registry(types, config, HandlerRegistry::global())
    }

    /// Maker bound to a specific handler registry (isolated setups, tests).
    pub fn with_registry(
        types: Arc<TypeRegistry>,
        config: ProxyConfig,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        let inline: Option<Arc<dyn InlineInstrumentation>> = if config.inline_transformation {
            Some(Arc::new(RegistryInliner::new(Arc::clone(&types))))
        } else {
            None
        };
        let subclasser = Arc::new(RegistrySubclasser::new(
            Arc::clone(&types),
            Arc::clone(&handlers),
        ));
        let gateway = TransformationGateway::new(
            Arc::clone(&types),
            inline,
            subclasser,
            config.warn_final_methods,
        );
        Self {
            types,
            handlers,
            gateway,
            instantiator: Arc::new(ZeroedInstantiator),
        }
    }

    /// Replace the construction-free instantiator collaborator.
    pub fn with_instantiator(mut self, instantiator: Arc<dyn Instantiator>) -> Self {
        self.instantiator = instantiator;
        self
    }

    /// Replace the whole transformation gateway (custom collaborators).
    pub fn with_gateway(mut self, gateway: TransformationGateway) -> Self {
        self.gateway = gateway;
        self
    }

    /// The handler registry this maker binds proxies into.
    pub fn handler_registry(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    /// Create a proxy for `ty` that also satisfies every type in
    /// `capabilities`, routing each invocation through `handler`.
    ///
    /// On success the returned reversal removes the handler association and
    /// undoes any inline transformation; it is idempotent and safe to call
    /// after the proxy is gone.
    pub fn create_proxy(
        &self,
        ty: TypeId,
        capabilities: &[TypeId],
        handler: Arc<dyn InterceptionHandler>,
        options: ProxyOptions,
    ) -> Result<Cancelable<ProxyHandle>> {
        let descriptor = self.types.get(ty)?;
        self.check_eligibility(&descriptor, capabilities)?;

        let capability_descriptors = self.capability_descriptors(&descriptor, capabilities)?;
        info!(
            ty = %descriptor.name,
            capabilities = capability_descriptors.len(),
            "creating proxy"
        );

        // Interface proxies are handler-backed by construction: no
        // transformation, no instantiation strategy, nothing to cancel.
        if descriptor.kind == TypeKind::Interface {
            let proxy = ProxyHandle::new(
                Arc::clone(&self.types),
                Arc::clone(&self.handlers),
                ty,
                capabilities.to_vec(),
                HashMap::new(),
                Some(handler),
            );
            debug!(ty = %descriptor.name, "interface proxy built");
            return Ok(Cancelable::new(proxy, Reversal::noop()));
        }

        let transform_reversal = self.gateway.make_interceptable(&descriptor)?;

        let producible = if descriptor.is_final {
            // No subtype can be generated; the producible type is the type
            // itself. Eligibility already rejected final-with-capabilities.
            Arc::clone(&descriptor)
        } else {
            match self
                .gateway
                .generate_subclass(&descriptor, &capability_descriptors)
            {
                Ok(generated) => generated,
                Err(source) => {
                    transform_reversal.run();
                    return Err(ProxyError::SubclassGeneration {
                        type_name: descriptor.name.clone(),
                        source,
                    });
                }
            }
        };

        let proxy = match instantiate(
            &self.types,
            &self.handlers,
            &producible,
            capabilities,
            &self.instantiator,
            &options,
        ) {
            Ok(proxy) => proxy,
            Err(source) => {
                transform_reversal.run();
                return Err(ProxyError::Instantiation {
                    type_name: producible.name.clone(),
                    source,
                });
            }
        };

        if let Err(source) = self.gateway.bind_handler(&proxy, handler) {
            transform_reversal.run();
            return Err(ProxyError::Instantiation {
                type_name: producible.name.clone(),
                source,
            });
        }

        let identity = proxy.identity();
        let instance = Arc::downgrade(proxy.instance());
        let handlers = Arc::clone(&self.handlers);
        let combined = Reversal::new(move || {
            handlers.unbind(identity, &instance);
            transform_reversal.run();
        });

        debug!(ty = %producible.name, ?identity, "proxy created");
        Ok(Cancelable::new(proxy, combined))
    }

    /// Fail fast on categorically invalid requests, before any mutation.
    fn check_eligibility(&self, descriptor: &TypeDescriptor, capabilities: &[TypeId]) -> Result<()> {
        let reason = match descriptor.kind {
            TypeKind::Primitive => Some(NotProxyableReason::Primitive),
            TypeKind::Array => Some(NotProxyableReason::Array),
            _ if self.types.is_excluded(descriptor.id) => Some(NotProxyableReason::Excluded),
            _ if descriptor.is_final && !capabilities.is_empty() => {
                Some(NotProxyableReason::FinalWithCapabilities)
            }
            _ => None,
        };
        match reason {
            Some(reason) => Err(ProxyError::NotProxyable {
                type_name: descriptor.name.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    fn capability_descriptors(
        &self,
        descriptor: &TypeDescriptor,
        capabilities: &[TypeId],
    ) -> Result<Vec<Arc<TypeDescriptor>>> {
        capabilities
            .iter()
            .map(|&id| {
                let cap = self.types.get(id)?;
                if cap.kind != TypeKind::Interface {
                    return Err(ProxyError::Definition(format!(
                        "capability '{}' requested for '{}' is not an interface",
                        cap.name, descriptor.name
                    )));
                }
                Ok(cap)
            })
            .collect()
    }
}
