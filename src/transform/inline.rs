// src/transform/inline.rs
//! Inline transformation
//!
//! Rewrites the method bodies of the original types in place so that every
//! call dispatches through a handler lookup keyed by receiver identity. The
//! rewrite is reversible: each rewritten entry is acquired from the
//! registry's reference-counted rewrite ledger, and the returned `Reversal`
//! releases them all at once. Overlapping transformations of the same types
//! share entries, so one proxy's cancellation never strips interception
//! from another still-live proxy.
//!
//! Because the rewrite happens in place, final methods are interceptable on
//! this path — overridability only matters for subclass generation.

use crate::model::{TypeDescriptor, TypeId, TypeKind, TypeRegistry};
use crate::proxy::cancel::Reversal;
use crate::transform::TransformationKind;
use crate::utils::errors::Result;
use std::sync::Arc;
use tracing::{debug, trace};

/// Optional collaborator performing reversible in-place rewriting of type
/// definitions. Absence of a configured collaborator is a legal setup; the
/// gateway then degrades to subclass generation only.
pub trait InlineInstrumentation: Send + Sync {
    /// Rewrite every type in the closure; the returned reversal undoes the
    /// whole rewrite.
    fn execute(
        &self,
        closure: &[Arc<TypeDescriptor>],
        kind: TransformationKind,
    ) -> Result<Reversal>;
}

/// Default inline collaborator: acquires a reference-counted rewrite of each
/// dispatch-table entry and keeps an explicit undo log of what it acquired.
pub struct RegistryInliner {
    types: Arc<TypeRegistry>,
}

impl RegistryInliner {
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self { types }
    }
}

impl InlineInstrumentation for RegistryInliner {
    fn execute(
        &self,
        closure: &[Arc<TypeDescriptor>],
        kind: TransformationKind,
    ) -> Result<Reversal> {
        debug!(?kind, types = closure.len(), "inline transformation");

        let mut undo: Vec<(TypeId, String)> = Vec::new();
        for descriptor in closure {
            // Interfaces and built-ins carry no concrete bodies to rewrite.
            if descriptor.kind != TypeKind::Class {
                continue;
            }
            for method in &descriptor.methods {
                if self.types.acquire_rewrite(descriptor.id, &method.name) {
                    trace!(ty = %descriptor.name, method = %method.name, "rewrote method body");
                    undo.push((descriptor.id, method.name.clone()));
                }
            }
        }

        if undo.is_empty() {
            return Ok(Reversal::noop());
        }

        let types = Arc::clone(&self.types);
        Ok(Reversal::new(move || {
            for (ty, method) in undo {
                types.release_rewrite(ty, &method);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::registry::MethodBody;
    use crate::model::TypeSpec;
    use crate::transform::closure::type_closure;
    use serde_json::json;

    fn widget_hierarchy(types: &TypeRegistry) -> (TypeId, TypeId) {
        let widget = types
            .define(
                TypeSpec::class("Widget")
                    .method_with_body("size", 0, |_, _| Ok(json!(3)))
                    .final_method("id", 0, |_, _| Ok(json!("widget"))),
            )
            .unwrap();
        let button = types
            .define(
                TypeSpec::class("Button")
                    .extends(widget)
                    .method_with_body("label", 0, |_, _| Ok(json!("ok"))),
            )
            .unwrap();
        (widget, button)
    }

    #[test]
    fn test_rewrite_covers_whole_closure() {
        let types = TypeRegistry::new();
        let (widget, button) = widget_hierarchy(&types);
        let inliner = RegistryInliner::new(Arc::clone(&types));

        let closure = type_closure(&types, button).unwrap();
        let _reversal = inliner
            .execute(&closure, TransformationKind::Intercept)
            .unwrap();

        assert!(matches!(
            types.body(button, "label"),
            Some(MethodBody::Trampoline { .. })
        ));
        assert!(matches!(
            types.body(widget, "size"),
            Some(MethodBody::Trampoline { .. })
        ));
        // In-place rewriting reaches final methods too.
        assert!(matches!(
            types.body(widget, "id"),
            Some(MethodBody::Trampoline { .. })
        ));
    }

    #[test]
    fn test_reversal_restores_displaced_bodies() {
        let types = TypeRegistry::new();
        let (widget, button) = widget_hierarchy(&types);
        let inliner = RegistryInliner::new(Arc::clone(&types));

        let closure = type_closure(&types, button).unwrap();
        let reversal = inliner
            .execute(&closure, TransformationKind::Intercept)
            .unwrap();

        reversal.run();
        assert!(matches!(types.body(widget, "size"), Some(MethodBody::Native(_))));
        assert!(matches!(types.body(widget, "id"), Some(MethodBody::Native(_))));
        assert!(matches!(types.body(button, "label"), Some(MethodBody::Native(_))));

        // Second run is a no-op.
        reversal.run();
        assert!(matches!(types.body(widget, "size"), Some(MethodBody::Native(_))));
    }

    #[test]
    fn test_overlapping_transformations_survive_first_reversal() {
        let types = TypeRegistry::new();
        let (widget, _button) = widget_hierarchy(&types);
        let inliner = RegistryInliner::new(Arc::clone(&types));
        let closure = type_closure(&types, widget).unwrap();

        let first = inliner
            .execute(&closure, TransformationKind::Intercept)
            .unwrap();
        let second = inliner
            .execute(&closure, TransformationKind::Intercept)
            .unwrap();

        // The second transformation still holds the shared rewrite.
        first.run();
        assert!(matches!(
            types.body(widget, "size"),
            Some(MethodBody::Trampoline { .. })
        ));

        second.run();
        assert!(matches!(types.body(widget, "size"), Some(MethodBody::Native(_))));
    }

    #[test]
    fn test_bodyless_closure_yields_noop_reversal() {
        let types = TypeRegistry::new();
        let printable = types
            .define(TypeSpec::interface("Printable").method("print", 0))
            .unwrap();
        let inliner = RegistryInliner::new(Arc::clone(&types));

        let closure = type_closure(&types, printable).unwrap();
        let reversal = inliner
            .execute(&closure, TransformationKind::Intercept)
            .unwrap();
        assert!(reversal.is_spent());
    }
}
