// src/model/registry.rs
//! Type registry and dispatch tables
//!
//! The registry is the global type-definition state of the engine: interned
//! `TypeDescriptor`s, per-type zero-argument constructors, and the dispatch
//! tables mapping `(type, method)` to a `MethodBody`. Inline transformation
//! mutates the dispatch tables (swapping native bodies for trampolines) and
//! restores them through the rewrite ledger; subclass generation adds tables
//! for newly interned types.
//!
//! Dispatch tables live in a `DashMap` so transformation can race with
//! concurrent invocations on live instances without corrupting entries.
//! Active rewrites are reference-counted per entry: overlapping
//! transformations of the same type share the trampoline, and the native
//! body comes back only when the last outstanding reversal releases it.

use crate::model::descriptor::{MethodDescriptor, TypeDescriptor, TypeId, TypeKind, TypeSpec};
use crate::proxy::handle::ProxyHandle;
use crate::utils::errors::{ProxyError, Result};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

/// Concrete behavior of a method: receives the receiver and the argument
/// values, produces a return value or an invocation-level failure.
pub type NativeBody = Arc<dyn Fn(&ProxyHandle, &[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Zero-argument constructor initializing the field state of a new instance.
pub type Constructor =
    Arc<dyn Fn(&mut HashMap<String, Value>) -> anyhow::Result<()> + Send + Sync>;

/// A dispatch-table entry.
#[derive(Clone)]
pub enum MethodBody {
    /// Original behavior, invoked directly.
    Native(NativeBody),

    /// Interception trampoline: looks up the receiver's handler by identity.
    /// On a registry miss the call falls through to `fallback` (the displaced
    /// or inherited native body); without one the call fails.
    Trampoline { fallback: Option<NativeBody> },
}

/// An in-place rewrite currently holding a dispatch entry: the displaced
/// native body plus how many reversals are still outstanding.
struct ActiveRewrite {
    displaced: NativeBody,
    count: usize,
}

impl std::fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native"),
            Self::Trampoline { fallback } => f
                .debug_struct("Trampoline")
                .field("has_fallback", &fallback.is_some())
                .finish(),
        }
    }
}

/// Identities of the bootstrapped built-in types.
///
/// All of these belong to the fixed excluded set: the type-system root, the
/// primitive kinds, their wrapper classes and the string type.
#[derive(Debug, Clone, Copy)]
pub struct WellKnownTypes {
    pub object: TypeId,
    pub bool_primitive: TypeId,
    pub int_primitive: TypeId,
    pub float_primitive: TypeId,
    pub char_primitive: TypeId,
    pub boolean: TypeId,
    pub integer: TypeId,
    pub float: TypeId,
    pub character: TypeId,
    pub string: TypeId,
}

impl WellKnownTypes {
    fn contains(&self, id: TypeId) -> bool {
        [
            self.object,
            self.bool_primitive,
            self.int_primitive,
            self.float_primitive,
            self.char_primitive,
            self.boolean,
            self.integer,
            self.float,
            self.character,
            self.string,
        ]
        .contains(&id)
    }
}

/// Process-visible type-definition state.
pub struct TypeRegistry {
    /// Interned descriptors, indexed by `TypeId`.
    types: RwLock<Vec<Arc<TypeDescriptor>>>,

    /// Name uniqueness index (also used to intern array types).
    by_name: RwLock<HashMap<String, TypeId>>,

    /// Dispatch tables: `(declaring type, method name)` to body.
    dispatch: DashMap<(TypeId, String), MethodBody>,

    /// Zero-argument constructors by declaring type.
    ctors: RwLock<HashMap<TypeId, Constructor>>,

    /// Reference-counted in-place rewrites keyed like the dispatch tables.
    rewrites: DashMap<(TypeId, String), ActiveRewrite>,

    /// Built-in type identities, set once during bootstrap.
    well_known: OnceCell<WellKnownTypes>,
}

impl TypeRegistry {
    /// Create a registry with the built-in excluded types bootstrapped.
    pub fn new() -> Arc<Self> {
        let registry = Arc::new(Self {
            types: RwLock::new(Vec::new()),
            by_name: RwLock::new(HashMap::new()),
            dispatch: DashMap::new(),
            ctors: RwLock::new(HashMap::new()),
            rewrites: DashMap::new(),
            well_known: OnceCell::new(),
        });

        registry.bootstrap();
        registry
    }

    fn bootstrap(&self) {
        // The root has no superclass; everything else defaults to it.
        let object = self
            .define(TypeSpec::class("Object"))
            .expect("bootstrap: Object");
        let bool_primitive = self
            .define(TypeSpec::primitive("bool"))
            .expect("bootstrap: bool");
        let int_primitive = self
            .define(TypeSpec::primitive("int"))
            .expect("bootstrap: int");
        let float_primitive = self
            .define(TypeSpec::primitive("float"))
            .expect("bootstrap: float");
        let char_primitive = self
            .define(TypeSpec::primitive("char"))
            .expect("bootstrap: char");
        let boolean = self
            .define(TypeSpec::class("Boolean").extends(object).sealed())
            .expect("bootstrap: Boolean");
        let integer = self
            .define(TypeSpec::class("Integer").extends(object).sealed())
            .expect("bootstrap: Integer");
        let float = self
            .define(TypeSpec::class("Float").extends(object).sealed())
            .expect("bootstrap: Float");
        let character = self
            .define(TypeSpec::class("Character").extends(object).sealed())
            .expect("bootstrap: Character");
        let string = self
            .define(TypeSpec::class("String").extends(object).sealed())
            .expect("bootstrap: String");

        let well_known = WellKnownTypes {
            object,
            bool_primitive,
            int_primitive,
            float_primitive,
            char_primitive,
            boolean,
            integer,
            float,
            character,
            string,
        };
        self.well_known
            .set(well_known)
            .expect("bootstrap runs once");

        debug!("type registry bootstrapped with built-in excluded types");
    }

    /// Identities of the built-in types.
    pub fn well_known(&self) -> &WellKnownTypes {
        self.well_known.get().expect("registry is bootstrapped")
    }

    /// Whether a type belongs to the fixed excluded set.
    pub fn is_excluded(&self, id: TypeId) -> bool {
        self.well_known().contains(id)
    }

    /// Intern a new type definition.
    pub fn define(&self, spec: TypeSpec) -> Result<TypeId> {
        {
            let by_name = self.by_name.read();
            if by_name.contains_key(&spec.name) {
                return Err(ProxyError::Definition(format!(
                    "type '{}' is already defined",
                    spec.name
                )));
            }
        }

        let superclass = match spec.superclass {
            Some(id) => {
                let sup = self.get(id)?;
                if sup.kind != TypeKind::Class {
                    return Err(ProxyError::Definition(format!(
                        "superclass '{}' of '{}' is not a class",
                        sup.name, spec.name
                    )));
                }
                if sup.is_final {
                    return Err(ProxyError::Definition(format!(
                        "'{}' cannot extend final type '{}'",
                        spec.name, sup.name
                    )));
                }
                Some(id)
            }
            // Classes default to the root once bootstrap has defined it.
            None if spec.kind == TypeKind::Class => self.well_known.get().map(|wk| wk.object),
            None => None,
        };

        for &iface in &spec.interfaces {
            let desc = self.get(iface)?;
            if desc.kind != TypeKind::Interface {
                return Err(ProxyError::Definition(format!(
                    "'{}' implements '{}', which is not an interface",
                    spec.name, desc.name
                )));
            }
        }

        let mut types = self.types.write();
        let id = TypeId::new(types.len() as u32);
        let descriptor = Arc::new(TypeDescriptor {
            id,
            name: spec.name.clone(),
            kind: spec.kind,
            is_final: spec.is_final,
            superclass,
            interfaces: spec.interfaces,
            methods: spec.methods,
        });
        types.push(descriptor);
        drop(types);

        self.by_name.write().insert(spec.name.clone(), id);
        for (method, body) in spec.bodies {
            self.dispatch.insert((id, method), MethodBody::Native(body));
        }
        if let Some(ctor) = spec.constructor {
            self.ctors.write().insert(id, ctor);
        }

        trace!(name = %spec.name, ?id, "defined type");
        Ok(id)
    }

    /// Look up a descriptor by identity.
    pub fn get(&self, id: TypeId) -> Result<Arc<TypeDescriptor>> {
        self.types
            .read()
            .get(id.raw() as usize)
            .cloned()
            .ok_or(ProxyError::UnknownType(id))
    }

    /// Look up a type by name.
    pub fn get_by_name(&self, name: &str) -> Option<TypeId> {
        self.by_name.read().get(name).copied()
    }

    /// Intern (or return) the array type over an element type.
    pub fn array_of(&self, element: TypeId) -> Result<TypeId> {
        let elem = self.get(element)?;
        let name = format!("{}[]", elem.name);
        if let Some(existing) = self.get_by_name(&name) {
            return Ok(existing);
        }

        let mut types = self.types.write();
        let id = TypeId::new(types.len() as u32);
        types.push(Arc::new(TypeDescriptor {
            id,
            name: name.clone(),
            kind: TypeKind::Array,
            is_final: true,
            superclass: Some(self.well_known().object),
            interfaces: Vec::new(),
            methods: Vec::new(),
        }));
        drop(types);

        self.by_name.write().insert(name, id);
        Ok(id)
    }

    /// Number of interned types (built-ins included).
    pub fn type_count(&self) -> usize {
        self.types.read().len()
    }

    /// Whether `sub` is `sup` or reachable from it through superclasses and
    /// implemented contracts.
    pub fn assignable(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![sub];
        while let Some(id) = stack.pop() {
            if id == sup {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Ok(desc) = self.get(id) {
                if let Some(s) = desc.superclass {
                    stack.push(s);
                }
                stack.extend(desc.interfaces.iter().copied());
            }
        }
        false
    }

    // ---- dispatch tables -------------------------------------------------

    /// Install (or replace) the dispatch entry for a declared method.
    pub fn install_body(&self, ty: TypeId, method: &str, body: MethodBody) {
        self.dispatch.insert((ty, method.to_string()), body);
    }

    /// Dispatch entry declared directly on a type, if any.
    pub fn body(&self, ty: TypeId, method: &str) -> Option<MethodBody> {
        self.dispatch
            .get(&(ty, method.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Acquire an interception rewrite of a dispatch entry.
    ///
    /// A native entry is swapped for a trampoline keeping the displaced body
    /// as fallback; an entry already rewritten this way just gains another
    /// outstanding reference. Returns `false` when there is nothing to
    /// rewrite (no entry, or a trampoline this registry did not install),
    /// in which case no matching `release_rewrite` is owed.
    pub fn acquire_rewrite(&self, ty: TypeId, method: &str) -> bool {
        let key = (ty, method.to_string());
        let Some(mut entry) = self.dispatch.get_mut(&key) else {
            return false;
        };
        match entry.value().clone() {
            MethodBody::Native(body) => {
                *entry.value_mut() = MethodBody::Trampoline {
                    fallback: Some(Arc::clone(&body)),
                };
                self.rewrites.insert(
                    key,
                    ActiveRewrite {
                        displaced: body,
                        count: 1,
                    },
                );
                true
            }
            MethodBody::Trampoline { .. } => match self.rewrites.get_mut(&key) {
                Some(mut active) => {
                    active.count += 1;
                    true
                }
                // Synthetic trampoline (generated subtype): not ours to undo.
                None => false,
            },
        }
    }

    /// Release one reference to an interception rewrite, restoring the
    /// displaced native body once no reversal is outstanding for the entry.
    pub fn release_rewrite(&self, ty: TypeId, method: &str) {
        let key = (ty, method.to_string());
        let Some(mut entry) = self.dispatch.get_mut(&key) else {
            return;
        };
        if let Some(mut active) = self.rewrites.get_mut(&key) {
            active.count -= 1;
            if active.count > 0 {
                return;
            }
        } else {
            return;
        }
        if let Some((_, active)) = self.rewrites.remove(&key) {
            *entry.value_mut() = MethodBody::Native(active.displaced);
        }
    }

    /// First dispatch entry found walking the superclass chain.
    pub fn resolve_entry(&self, ty: TypeId, method: &str) -> Option<MethodBody> {
        let mut current = Some(ty);
        while let Some(id) = current {
            if let Some(body) = self.body(id, method) {
                return Some(body);
            }
            current = self.get(id).ok().and_then(|d| d.superclass);
        }
        None
    }

    /// Concrete behavior a normal (unintercepted) call would run: unwraps
    /// trampolines down to their fallback.
    pub fn resolve_native(&self, ty: TypeId, method: &str) -> Option<NativeBody> {
        match self.resolve_entry(ty, method)? {
            MethodBody::Native(body) => Some(body),
            MethodBody::Trampoline { fallback } => fallback,
        }
    }

    /// Zero-argument constructor, searched up the superclass chain.
    pub fn resolve_constructor(&self, ty: TypeId) -> Option<Constructor> {
        let mut current = Some(ty);
        while let Some(id) = current {
            if let Some(ctor) = self.ctors.read().get(&id) {
                return Some(Arc::clone(ctor));
            }
            current = self.get(id).ok().and_then(|d| d.superclass);
        }
        None
    }

    // ---- method resolution ----------------------------------------------

    /// Every method visible on a type: own declarations first, then
    /// inherited and contract-declared ones, first definition winning
    /// per name.
    pub fn method_set(&self, ty: TypeId) -> Vec<MethodDescriptor> {
        let mut out: Vec<MethodDescriptor> = Vec::new();
        let mut names: HashSet<String> = HashSet::new();
        let mut seen: HashSet<TypeId> = HashSet::new();
        let mut queue: VecDeque<TypeId> = VecDeque::from([ty]);

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let Ok(desc) = self.get(id) else { continue };
            for method in &desc.methods {
                if names.insert(method.name.clone()) {
                    out.push(method.clone());
                }
            }
            if let Some(s) = desc.superclass {
                queue.push_back(s);
            }
            queue.extend(desc.interfaces.iter().copied());
        }
        out
    }

    /// Descriptor of a visible method, by name.
    pub fn resolve_method(&self, ty: TypeId, method: &str) -> Option<MethodDescriptor> {
        self.method_set(ty).into_iter().find(|m| m.name == method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bootstrap_excluded_set() {
        let types = TypeRegistry::new();
        let wk = *types.well_known();

        assert!(types.is_excluded(wk.object));
        assert!(types.is_excluded(wk.string));
        assert!(types.is_excluded(wk.integer));
        assert_eq!(types.get(wk.string).unwrap().name, "String");
        assert!(types.get(wk.string).unwrap().is_final);
        assert_eq!(types.get(wk.int_primitive).unwrap().kind, TypeKind::Primitive);
    }

    #[test]
    fn test_define_defaults_to_object_superclass() {
        let types = TypeRegistry::new();
        let widget = types.define(TypeSpec::class("Widget")).unwrap();
        let desc = types.get(widget).unwrap();
        assert_eq!(desc.superclass, Some(types.well_known().object));
        assert!(!types.is_excluded(widget));
    }

    #[test]
    fn test_define_rejects_duplicate_name() {
        let types = TypeRegistry::new();
        types.define(TypeSpec::class("Widget")).unwrap();
        let err = types.define(TypeSpec::class("Widget")).unwrap_err();
        assert!(matches!(err, ProxyError::Definition(_)));
    }

    #[test]
    fn test_define_rejects_final_superclass() {
        let types = TypeRegistry::new();
        let string = types.well_known().string;
        let err = types
            .define(TypeSpec::class("MyString").extends(string))
            .unwrap_err();
        assert!(matches!(err, ProxyError::Definition(_)));
    }

    #[test]
    fn test_define_rejects_class_as_interface() {
        let types = TypeRegistry::new();
        let widget = types.define(TypeSpec::class("Widget")).unwrap();
        let err = types
            .define(TypeSpec::class("Gadget").implements(widget))
            .unwrap_err();
        assert!(matches!(err, ProxyError::Definition(_)));
    }

    #[test]
    fn test_array_interning() {
        let types = TypeRegistry::new();
        let widget = types.define(TypeSpec::class("Widget")).unwrap();
        let arr = types.array_of(widget).unwrap();
        let again = types.array_of(widget).unwrap();

        assert_eq!(arr, again);
        let desc = types.get(arr).unwrap();
        assert_eq!(desc.kind, TypeKind::Array);
        assert_eq!(desc.name, "Widget[]");
    }

    #[test]
    fn test_assignable_walks_closure() {
        let types = TypeRegistry::new();
        let comparable = types
            .define(TypeSpec::interface("Comparable").method("compare_to", 1))
            .unwrap();
        let widget = types
            .define(TypeSpec::class("Widget").implements(comparable))
            .unwrap();
        let button = types.define(TypeSpec::class("Button").extends(widget)).unwrap();

        assert!(types.assignable(button, widget));
        assert!(types.assignable(button, comparable));
        assert!(types.assignable(button, types.well_known().object));
        assert!(!types.assignable(widget, button));
    }

    #[test]
    fn test_acquire_and_release_rewrite() {
        let types = TypeRegistry::new();
        let widget = types
            .define(TypeSpec::class("Widget").method_with_body("size", 0, |_, _| Ok(json!(3))))
            .unwrap();

        assert!(types.acquire_rewrite(widget, "size"));
        assert!(matches!(
            types.body(widget, "size"),
            Some(MethodBody::Trampoline { .. })
        ));

        types.release_rewrite(widget, "size");
        assert!(matches!(types.body(widget, "size"), Some(MethodBody::Native(_))));
    }

    #[test]
    fn test_overlapping_rewrites_restore_on_last_release() {
        let types = TypeRegistry::new();
        let widget = types
            .define(TypeSpec::class("Widget").method_with_body("size", 0, |_, _| Ok(json!(3))))
            .unwrap();

        assert!(types.acquire_rewrite(widget, "size"));
        assert!(types.acquire_rewrite(widget, "size"));

        // First release keeps the shared trampoline installed.
        types.release_rewrite(widget, "size");
        assert!(matches!(
            types.body(widget, "size"),
            Some(MethodBody::Trampoline { .. })
        ));

        types.release_rewrite(widget, "size");
        assert!(matches!(types.body(widget, "size"), Some(MethodBody::Native(_))));
        // Excess releases after the entry is restored do nothing.
        types.release_rewrite(widget, "size");
        assert!(matches!(types.body(widget, "size"), Some(MethodBody::Native(_))));
    }

    #[test]
    fn test_acquire_rewrite_skips_foreign_trampolines() {
        let types = TypeRegistry::new();
        let widget = types.define(TypeSpec::class("Widget").method("size", 0)).unwrap();

        // No dispatch entry at all.
        assert!(!types.acquire_rewrite(widget, "size"));

        // A synthetic trampoline (as subclass generation installs) is not
        // owned by the rewrite ledger.
        types.install_body(widget, "size", MethodBody::Trampoline { fallback: None });
        assert!(!types.acquire_rewrite(widget, "size"));
        types.release_rewrite(widget, "size");
        assert!(matches!(
            types.body(widget, "size"),
            Some(MethodBody::Trampoline { fallback: None })
        ));
    }

    #[test]
    fn test_resolve_entry_walks_superclass_chain() {
        let types = TypeRegistry::new();
        let widget = types
            .define(TypeSpec::class("Widget").method_with_body("size", 0, |_, _| Ok(json!(3))))
            .unwrap();
        let button = types.define(TypeSpec::class("Button").extends(widget)).unwrap();

        assert!(types.body(button, "size").is_none());
        assert!(types.resolve_entry(button, "size").is_some());
        assert!(types.resolve_native(button, "size").is_some());
    }

    #[test]
    fn test_resolve_constructor_inherited() {
        let types = TypeRegistry::new();
        let widget = types
            .define(TypeSpec::class("Widget").constructor(|fields| {
                fields.insert("size".to_string(), json!(3));
                Ok(())
            }))
            .unwrap();
        let button = types.define(TypeSpec::class("Button").extends(widget)).unwrap();

        let ctor = types.resolve_constructor(button).unwrap();
        let mut fields = HashMap::new();
        ctor(&mut fields).unwrap();
        assert_eq!(fields.get("size"), Some(&json!(3)));

        assert!(types.resolve_constructor(types.well_known().object).is_none());
    }

    #[test]
    fn test_method_set_own_declaration_wins() {
        let types = TypeRegistry::new();
        let widget = types.define(TypeSpec::class("Widget").method("render", 2)).unwrap();
        let button = types
            .define(TypeSpec::class("Button").extends(widget).method("render", 1))
            .unwrap();

        let resolved = types.resolve_method(button, "render").unwrap();
        assert_eq!(resolved.arity, 1);

        let parent = types.resolve_method(widget, "render").unwrap();
        assert_eq!(parent.arity, 2);
    }

    #[test]
    fn test_method_set_includes_contracts() {
        let types = TypeRegistry::new();
        let comparable = types
            .define(TypeSpec::interface("Comparable").method("compare_to", 1))
            .unwrap();
        let widget = types
            .define(
                TypeSpec::class("Widget")
                    .implements(comparable)
                    .method("render", 0),
            )
            .unwrap();

        let set = types.method_set(widget);
        let names: Vec<&str> = set.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"render"));
        assert!(names.contains(&"compare_to"));
    }
}
