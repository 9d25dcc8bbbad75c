// src/utils/errors.rs
//! Error taxonomy for proxy construction and interception
//!
//! Every collaborator failure is wrapped into a `ProxyError` variant that
//! identifies the phase it happened in (subclassing vs instantiation), with
//! the original cause chained underneath. Diagnostic conditions (e.g. final
//! methods that cannot be intercepted in degraded mode) are logged, never
//! raised.

use crate::model::TypeId;
use std::fmt;
use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Why a type was rejected before any mutation took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotProxyableReason {
    /// Primitive type kinds cannot be proxied.
    Primitive,

    /// Array type kinds cannot be proxied.
    Array,

    /// Member of the fixed excluded set (type-system root, primitive
    /// wrappers, the string type).
    Excluded,

    /// Final type requested together with extra capabilities: no subtype
    /// can be generated to carry them.
    FinalWithCapabilities,
}

impl fmt::Display for NotProxyableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Primitive => "primitive",
            Self::Array => "array",
            Self::Excluded => "excluded",
            Self::FinalWithCapabilities => "final-with-extra-capabilities",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by the proxy construction engine.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The request is categorically invalid; nothing was mutated.
    #[error("type '{type_name}' cannot be proxied ({reason})")]
    NotProxyable {
        type_name: String,
        reason: NotProxyableReason,
    },

    /// The subclassing collaborator failed; any transformation already
    /// performed has been reversed.
    #[error("subclass generation failed for '{type_name}'")]
    SubclassGeneration {
        type_name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Instantiation failed under the chosen strategy; any transformation
    /// already performed has been reversed.
    #[error("instantiation failed for '{type_name}'")]
    Instantiation {
        type_name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A method invocation on a live proxy failed.
    #[error("invocation of '{method}' failed")]
    Invocation {
        method: String,
        #[source]
        source: anyhow::Error,
    },

    /// A type id that is not present in the type registry.
    #[error("unknown type id {0:?}")]
    UnknownType(TypeId),

    /// An invalid type definition was submitted to the registry.
    #[error("invalid type definition: {0}")]
    Definition(String),
}
