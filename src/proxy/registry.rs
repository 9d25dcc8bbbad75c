// src/proxy/registry.rs
//! Handler registry
//!
//! Process-wide mapping from live proxy identity to interception handler.
//! Entries hold the proxy weakly so the registry never extends a proxy's
//! lifetime: once every other owner drops the instance, the entry is dead
//! and gets collected on the next lookup miss or explicit `sweep`.
//!
//! Removal is best-effort by design — a lookup racing a removal simply
//! misses, and the caller falls back to original behavior. `remove` with an
//! identity that is no longer present is a no-op.

use crate::proxy::handle::{ProxyHandle, ProxyIdentity};
use crate::proxy::handler::InterceptionHandler;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

static GLOBAL: Lazy<Arc<HandlerRegistry>> = Lazy::new(|| Arc::new(HandlerRegistry::new()));

struct Entry {
    proxy: Weak<crate::proxy::handle::ProxyInstance>,
    handler: Arc<dyn InterceptionHandler>,
}

/// Weak-keyed concurrent map from proxy identity to handler.
pub struct HandlerRegistry {
    entries: DashMap<ProxyIdentity, Entry>,
}

impl HandlerRegistry {
    /// Create an empty registry (isolated; see `global` for the process-wide
    /// instance).
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// The process-wide registry, initialized on first use.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Associate a proxy with its handler. Replaces any previous entry for
    /// the same identity.
    pub fn register(&self, proxy: &ProxyHandle, handler: Arc<dyn InterceptionHandler>) {
        let identity = proxy.identity();
        debug!(?identity, ty = %proxy.type_name(), "registering handler");
        self.entries.insert(
            identity,
            Entry {
                proxy: Arc::downgrade(proxy.instance()),
                handler,
            },
        );
    }

    /// Remove the entry for an identity. Safe to call when the entry is
    /// already gone.
    pub fn remove(&self, identity: ProxyIdentity) -> bool {
        let removed = self.entries.remove(&identity).is_some();
        trace!(?identity, removed, "remove handler entry");
        removed
    }

    /// Remove the entry for an identity only if it still belongs to the
    /// given allocation. A later instance recycled onto the same address
    /// keeps its entry; the comparison works whether or not the original
    /// proxy is still alive.
    pub(crate) fn unbind(
        &self,
        identity: ProxyIdentity,
        instance: &Weak<crate::proxy::handle::ProxyInstance>,
    ) -> bool {
        let removed = self
            .entries
            .remove_if(&identity, |_, entry| entry.proxy.ptr_eq(instance))
            .is_some();
        trace!(?identity, removed, "unbind handler entry");
        removed
    }

    /// Handler for a live proxy, if one is registered.
    ///
    /// The weak entry is upgraded and pointer-compared against the caller so
    /// a recycled allocation address can never resolve to a stale handler.
    /// Dead entries found on the way are dropped opportunistically.
    pub fn lookup(&self, proxy: &ProxyHandle) -> Option<Arc<dyn InterceptionHandler>> {
        let identity = proxy.identity();
        let found = self.entries.get(&identity).and_then(|entry| {
            entry
                .proxy
                .upgrade()
                .filter(|live| Arc::ptr_eq(live, proxy.instance()))
                .map(|_| Arc::clone(&entry.handler))
        });
        if found.is_none() {
            self.entries
                .remove_if(&identity, |_, entry| entry.proxy.strong_count() == 0);
        }
        found
    }

    /// Whether an entry (live or dead) exists for an identity.
    pub fn contains(&self, identity: ProxyIdentity) -> bool {
        self.entries.contains_key(&identity)
    }

    /// Drop every entry whose proxy is no longer alive.
    pub fn sweep(&self) {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.proxy.strong_count() > 0);
        let collected = before - self.entries.len();
        if collected > 0 {
            debug!(collected, "swept dead handler entries");
        }
    }

    /// Number of entries currently held (dead ones included until swept).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
