// src/proxy/instantiate.rs
//! Instantiation strategy selection
//!
//! Decides how to materialize an instance of the producible type without
//! running arbitrary user constructors, first match wins:
//!
//! 1. An existing instance was supplied: attach to it, no construction
//! 2. The default-construction path was requested: run the zero-argument
//!    constructor (searched up the superclass chain)
//! 3. Otherwise: delegate to the injected construction-free instantiator

use crate::model::{TypeDescriptor, TypeId, TypeRegistry};
use crate::proxy::handle::ProxyHandle;
use crate::proxy::registry::HandlerRegistry;
use anyhow::{anyhow, Context};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Collaborator producing raw field state for an arbitrary generated type
/// without running any constructor.
pub trait Instantiator: Send + Sync {
    /// Field state for a fresh, construction-free instance of `ty`.
    fn instance(&self, ty: &TypeDescriptor) -> anyhow::Result<HashMap<String, Value>>;
}

/// Default instantiator: blank field state, the construction-free baseline.
pub struct ZeroedInstantiator;

impl Instantiator for ZeroedInstantiator {
    fn instance(&self, _ty: &TypeDescriptor) -> anyhow::Result<HashMap<String, Value>> {
        Ok(HashMap::new())
    }
}

/// Per-request instantiation options.
#[derive(Clone, Default)]
pub struct ProxyOptions {
    /// Construct the producible type through its zero-argument constructor
    /// instead of the construction-free instantiator.
    pub use_default_constructor: bool,

    /// Attach to this instance instead of constructing one. Takes precedence
    /// over every other strategy; the producible type is ignored.
    pub existing: Option<ProxyHandle>,
}

impl ProxyOptions {
    /// Request the default-construction path.
    pub fn with_default_constructor(mut self) -> Self {
        self.use_default_constructor = true;
        self
    }

    /// Attach to an existing instance.
    pub fn attached(instance: ProxyHandle) -> Self {
        Self {
            use_default_constructor: false,
            existing: Some(instance),
        }
    }
}

impl std::fmt::Debug for ProxyOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyOptions")
            .field("use_default_constructor", &self.use_default_constructor)
            .field("attached", &self.existing.is_some())
            .finish()
    }
}

/// Select a strategy and produce the instance the proxy will wrap.
pub(crate) fn instantiate(
    types: &Arc<TypeRegistry>,
    handlers: &Arc<HandlerRegistry>,
    producible: &Arc<TypeDescriptor>,
    capabilities: &[TypeId],
    instantiator: &Arc<dyn Instantiator>,
    options: &ProxyOptions,
) -> anyhow::Result<ProxyHandle> {
    if let Some(existing) = &options.existing {
        debug!(ty = %existing.type_name(), "attaching to existing instance");
        return Ok(existing.clone());
    }

    let fields = if options.use_default_constructor {
        let ctor = types.resolve_constructor(producible.id).ok_or_else(|| {
            anyhow!(
                "no zero-argument constructor available for '{}'",
                producible.name
            )
        })?;
        let mut fields = HashMap::new();
        ctor(&mut fields)
            .with_context(|| format!("constructor of '{}' failed", producible.name))?;
        fields
    } else {
        instantiator
            .instance(producible)
            .with_context(|| format!("instantiator failed for '{}'", producible.name))?
    };

    Ok(ProxyHandle::new(
        Arc::clone(types),
        Arc::clone(handlers),
        producible.id,
        capabilities.to_vec(),
        fields,
        None,
    ))
}
