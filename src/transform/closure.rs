// src/transform/closure.rs
//! Ancestor/contract closure walk
//!
//! Computes the full set of types the inline path must rewrite: the type
//! itself, its superclass chain up to the root, and every directly or
//! transitively implemented contract at each level. The result is
//! deduplicated; iteration order carries no meaning beyond completeness.

use crate::model::{TypeDescriptor, TypeId, TypeRegistry};
use crate::utils::errors::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// The deduplicated ancestor/contract closure of a type.
pub fn type_closure(types: &TypeRegistry, ty: TypeId) -> Result<Vec<Arc<TypeDescriptor>>> {
    let mut seen: HashSet<TypeId> = HashSet::new();
    let mut out: Vec<Arc<TypeDescriptor>> = Vec::new();
    let mut stack: Vec<TypeId> = vec![ty];

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let descriptor = types.get(id)?;
        if let Some(superclass) = descriptor.superclass {
            stack.push(superclass);
        }
        stack.extend(descriptor.interfaces.iter().copied());
        out.push(descriptor);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeSpec;
    use proptest::prelude::*;

    #[test]
    fn test_closure_contains_self_and_root() {
        let types = TypeRegistry::new();
        let widget = types.define(TypeSpec::class("Widget")).unwrap();

        let closure = type_closure(&types, widget).unwrap();
        let ids: Vec<TypeId> = closure.iter().map(|d| d.id).collect();
        assert!(ids.contains(&widget));
        assert!(ids.contains(&types.well_known().object));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_closure_transitive_contracts() {
        let types = TypeRegistry::new();
        let printable = types
            .define(TypeSpec::interface("Printable").method("print", 0))
            .unwrap();
        let comparable = types
            .define(
                TypeSpec::interface("Comparable")
                    .implements(printable)
                    .method("compare_to", 1),
            )
            .unwrap();
        let widget = types
            .define(TypeSpec::class("Widget").implements(comparable))
            .unwrap();
        let button = types
            .define(TypeSpec::class("Button").extends(widget))
            .unwrap();

        let closure = type_closure(&types, button).unwrap();
        let ids: HashSet<TypeId> = closure.iter().map(|d| d.id).collect();
        assert!(ids.contains(&button));
        assert!(ids.contains(&widget));
        assert!(ids.contains(&comparable));
        assert!(ids.contains(&printable));
        assert!(ids.contains(&types.well_known().object));
    }

    #[test]
    fn test_closure_deduplicates_diamond() {
        let types = TypeRegistry::new();
        let printable = types.define(TypeSpec::interface("Printable")).unwrap();
        let a = types
            .define(TypeSpec::interface("A").implements(printable))
            .unwrap();
        let b = types
            .define(TypeSpec::interface("B").implements(printable))
            .unwrap();
        let widget = types
            .define(TypeSpec::class("Widget").implements(a).implements(b))
            .unwrap();

        let closure = type_closure(&types, widget).unwrap();
        let printable_count = closure.iter().filter(|d| d.id == printable).count();
        assert_eq!(printable_count, 1);
        assert_eq!(closure.len(), 5);
    }

    proptest! {
        // A linear chain of N classes always closes over exactly the chain
        // plus the root, regardless of where the walk starts.
        #[test]
        fn prop_chain_closure_complete(depth in 1usize..12, start_offset in 0usize..12) {
            let types = TypeRegistry::new();
            let mut chain = Vec::new();
            let mut parent: Option<TypeId> = None;
            for i in 0..depth {
                let mut spec = TypeSpec::class(format!("C{}", i));
                if let Some(p) = parent {
                    spec = spec.extends(p);
                }
                let id = types.define(spec).unwrap();
                chain.push(id);
                parent = Some(id);
            }

            let start = chain[start_offset % depth];
            let closure = type_closure(&types, start).unwrap();
            let ids: HashSet<TypeId> = closure.iter().map(|d| d.id).collect();

            // Everything from the start down to the root, nothing above.
            prop_assert!(ids.contains(&types.well_known().object));
            for (i, id) in chain.iter().enumerate() {
                prop_assert_eq!(ids.contains(id), i <= start_offset % depth);
            }
            prop_assert_eq!(closure.len(), ids.len());
        }
    }
}
