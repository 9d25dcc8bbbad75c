// src/proxy/handler.rs
//! Interception handler contract
//!
//! The single capability every proxy routes through: given the receiver, the
//! method identity and the argument values, produce a return value or signal
//! an invocation-level failure. Handlers are supplied by the caller and only
//! referenced (never owned) by the engine.

use crate::proxy::handle::ProxyHandle;
use serde_json::Value;

/// An intercepted method invocation, handed to the handler as one unit.
#[derive(Debug, Clone)]
pub struct MethodCall {
    /// The proxy the call was made on.
    pub target: ProxyHandle,

    /// Name of the receiver's produced type.
    pub type_name: String,

    /// Method name as resolved at the call site.
    pub method: String,

    /// Argument values in call order.
    pub args: Vec<Value>,
}

/// Caller-supplied interception logic.
///
/// Implemented for any `Fn(MethodCall) -> anyhow::Result<Value>` closure,
/// which covers the common test-double case.
pub trait InterceptionHandler: Send + Sync {
    /// Decide the outcome of an intercepted call.
    fn handle(&self, call: MethodCall) -> anyhow::Result<Value>;
}

impl<F> InterceptionHandler for F
where
    F: Fn(MethodCall) -> anyhow::Result<Value> + Send + Sync,
{
    fn handle(&self, call: MethodCall) -> anyhow::Result<Value> {
        self(call)
    }
}
