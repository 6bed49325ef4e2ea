//! The shared extension bag.
//!
//! Every layer built from the same root [`crate::Stack`] sees the same
//! [`Capabilities`] value: wrapping hands out a new stack but never copies
//! the bag. A capability attached by one wrapper (the event wrapper's
//! emitter, say) is therefore visible to all layers, inner and outer, added
//! before or after it.
//!
//! The bag is an explicit context object scoped to one composition lineage,
//! not process-wide state: two stacks built from different roots never share
//! capabilities.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::emitter::Emitter;

/// Name under which the event wrapper attaches its [`Emitter`].
pub const EMITTER: &str = "emitter";

type AnyCapability = Arc<dyn Any + Send + Sync>;

/// Mutable mapping from capability name to capability instance, shared by
/// reference across every layer of one composed stack.
#[derive(Clone, Default)]
pub struct Capabilities {
    inner: Arc<RwLock<HashMap<String, AnyCapability>>>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("Capabilities").field("names", &names).finish()
    }
}

impl Capabilities {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a capability under `name`, replacing any existing one.
    pub fn insert<T: Any + Send + Sync>(&self, name: &str, value: Arc<T>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
    }

    /// Looks up a capability by name and type.
    ///
    /// Returns `None` if the name is absent or holds a different type.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let value = guard.get(name)?.clone();
        Arc::downcast(value).ok()
    }

    /// Returns `true` if a capability is attached under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Looks up a capability, attaching the result of `init` if absent.
    ///
    /// The insert-if-absent check holds the write lock, so two racing
    /// layers agree on a single instance.
    pub fn get_or_insert_with<T, F>(&self, name: &str, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Arc<T>,
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = guard.get(name) {
            if let Ok(typed) = Arc::downcast::<T>(existing.clone()) {
                return typed;
            }
            // A different type under the same name is a misuse; replace it.
        }
        let fresh = init();
        let capability: AnyCapability = fresh.clone();
        guard.insert(name.to_string(), capability);
        fresh
    }

    /// The shared event emitter, if any wrapper has attached one.
    #[must_use]
    pub fn emitter(&self) -> Option<Arc<Emitter>> {
        self.get(EMITTER)
    }

    /// Returns the shared emitter, attaching a fresh one if absent.
    ///
    /// Idempotent: reattaching is a no-op, so multiple event wrapper
    /// layers share one emitter.
    #[must_use]
    pub fn attach_emitter(&self) -> Arc<Emitter> {
        self.get_or_insert_with(EMITTER, || Arc::new(Emitter::new()))
    }
}
