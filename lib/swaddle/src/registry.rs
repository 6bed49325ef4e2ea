//! Process-wide registry of custom wrapper builders.
//!
//! Built-in wrappers are addressed with the typed [`crate::Wrapper`]
//! descriptor; the registry exists for third-party behaviors that want to be
//! stacked by name via [`crate::Stack::wrap_named`]. A builder takes the
//! shared capability bag and the current callable and returns the new
//! outermost callable; its configuration is captured in the closure when it
//! is registered.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::capabilities::Capabilities;
use crate::stack::BoxedService;

/// A wrapper builder: given the capability bag and the next-in-chain
/// callable, produce the new callable.
pub type WrapFn = Arc<dyn Fn(&Capabilities, BoxedService) -> BoxedService + Send + Sync>;

#[derive(Default)]
struct Registry {
    builders: HashMap<String, WrapFn>,
}

static GLOBAL: LazyLock<RwLock<Registry>> = LazyLock::new(|| RwLock::new(Registry::default()));

/// Registers a wrapper builder under `name`.
///
/// Later registration under the same name replaces the earlier one.
pub fn register<F>(name: impl Into<String>, builder: F)
where
    F: Fn(&Capabilities, BoxedService) -> BoxedService + Send + Sync + 'static,
{
    GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .builders
        .insert(name.into(), Arc::new(builder));
}

/// Looks up a registered builder.
pub(crate) fn lookup(name: &str) -> Option<WrapFn> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .builders
        .get(name)
        .cloned()
}

/// Returns `true` if a builder is registered under `name`.
#[must_use]
pub fn is_registered(name: &str) -> bool {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .builders
        .contains_key(name)
}
