// src/transform/mod.rs
//! Type transformation gateway
//!
//! Abstracts the two mutually exclusive mechanisms for making a non-interface
//! type interceptable:
//!
//! - **Inline transformation**: in-place rewrite of the original types'
//!   method bodies over the full ancestor/contract closure, reversible
//! - **Subclass generation**: a new type extending the original with every
//!   overridable method overridden, not reversible as a unit
//!
//! Which one applies is a process-level configuration decision: when no
//! inline collaborator is configured the gateway degrades to a no-op reversal
//! and warns about final methods, which can then never be intercepted.

pub mod closure;
pub mod inline;
pub mod subclass;

use crate::model::{TypeDescriptor, TypeRegistry};
use crate::proxy::cancel::Reversal;
use crate::proxy::handle::ProxyHandle;
use crate::proxy::handler::InterceptionHandler;
use crate::utils::errors::Result;
use std::sync::Arc;
use tracing::{debug, warn};

// Re-export commonly used types
pub use closure::type_closure;
pub use inline::{InlineInstrumentation, RegistryInliner};
pub use subclass::{RegistrySubclasser, SubclassInstrumentation};

/// What an inline rewrite is for. Carried on the collaborator contract so
/// future dispatch modes do not change its signature.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationKind {
    /// Route every rewritten method through the handler lookup.
    Intercept,
}

/// Facade over the configured transformation collaborators.
pub struct TransformationGateway {
    types: Arc<TypeRegistry>,
    inline: Option<Arc<dyn InlineInstrumentation>>,
    subclasser: Arc<dyn SubclassInstrumentation>,
    warn_final_methods: bool,
}

impl TransformationGateway {
    pub fn new(
        types: Arc<TypeRegistry>,
        inline: Option<Arc<dyn InlineInstrumentation>>,
        subclasser: Arc<dyn SubclassInstrumentation>,
        warn_final_methods: bool,
    ) -> Self {
        Self {
            types,
            inline,
            subclasser,
            warn_final_methods,
        }
    }

    /// Whether an inline collaborator is configured.
    pub fn inline_configured(&self) -> bool {
        self.inline.is_some()
    }

    /// Make the instance hierarchy of a type interceptable.
    ///
    /// With an inline collaborator this rewrites the whole ancestor/contract
    /// closure and returns the reversal undoing it. Without one this is a
    /// no-op that diagnoses every final method, since those can never be
    /// intercepted through a generated subtype.
    pub fn make_interceptable(&self, ty: &Arc<TypeDescriptor>) -> Result<Reversal> {
        match &self.inline {
            Some(inline) => {
                let closure = type_closure(&self.types, ty.id)?;
                debug!(ty = %ty.name, closure = closure.len(), "inline path");
                inline.execute(&closure, TransformationKind::Intercept)
            }
            None => {
                if self.warn_final_methods {
                    for method in self.types.method_set(ty.id) {
                        if method.is_final {
                            warn!(
                                ty = %ty.name,
                                method = %method.name,
                                "final method will not be intercepted without inline transformation"
                            );
                        }
                    }
                }
                Ok(Reversal::noop())
            }
        }
    }

    /// Generate a subtype of `ty` implementing each capability.
    pub fn generate_subclass(
        &self,
        ty: &Arc<TypeDescriptor>,
        capabilities: &[Arc<TypeDescriptor>],
    ) -> anyhow::Result<Arc<TypeDescriptor>> {
        self.subclasser.subclass(ty, capabilities)
    }

    /// Wire a produced instance to its handler.
    pub fn bind_handler(
        &self,
        instance: &ProxyHandle,
        handler: Arc<dyn InterceptionHandler>,
    ) -> anyhow::Result<()> {
        self.subclasser.bind_handler(instance, handler)
    }
}
