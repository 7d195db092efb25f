//! Named override slots, resolved late.
//!
//! Slots are looked up by name at the moment a spliced call executes, never
//! captured at patch-install time. A host can re-register a slot between
//! invocations (say, after a settings toggle) and the next execution of the
//! patched body picks it up without re-patching.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::exec::Value;

/// A value transformer: receives the value currently on top of the
/// evaluation stack plus the context values the splice loaded, returns the
/// replacement value.
pub type TransformFn = Arc<dyn Fn(Value, &[Value]) -> Value + Send + Sync>;

/// A side-effecting observer: receives the loaded context values, used
/// purely for diagnostics. Never alters stack values or control flow.
pub type ObserveFn = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// One registered override.
#[derive(Clone)]
pub enum Override {
    Transform(TransformFn),
    Observe(ObserveFn),
}

/// The slot table. Shared behind an [`Arc`] between the code installing
/// overrides and every thread executing patched bodies.
#[derive(Default)]
pub struct OverrideRegistry {
    slots: RwLock<HashMap<String, Override>>,
}

impl OverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) a transformer under `name`.
    pub fn register_transform(
        &self,
        name: impl Into<String>,
        f: impl Fn(Value, &[Value]) -> Value + Send + Sync + 'static,
    ) {
        self.write().insert(name.into(), Override::Transform(Arc::new(f)));
    }

    /// Install (or replace) an observer under `name`.
    pub fn register_observe(
        &self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) + Send + Sync + 'static,
    ) {
        self.write().insert(name.into(), Override::Observe(Arc::new(f)));
    }

    /// Remove a slot. Returns whether it existed. Spliced call sites naming
    /// a removed slot degrade to a no-op at their next execution.
    pub fn unregister(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    /// Resolve a slot by name, as the executing call site does.
    pub fn resolve(&self, name: &str) -> Option<Override> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Override>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_returns_latest_registration() {
        let reg = OverrideRegistry::new();
        reg.register_transform("speed", |_, _| Value::Int(1));
        reg.register_transform("speed", |_, _| Value::Int(2));

        let Some(Override::Transform(f)) = reg.resolve("speed") else {
            panic!("expected transform slot");
        };
        assert_eq!(f(Value::Null, &[]), Value::Int(2));
    }

    #[test]
    fn unregister_empties_slot() {
        let reg = OverrideRegistry::new();
        reg.register_observe("log", |_| {});
        assert!(reg.contains("log"));
        assert!(reg.unregister("log"));
        assert!(!reg.unregister("log"));
        assert!(reg.resolve("log").is_none());
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        let reg = Arc::new(OverrideRegistry::new());
        let handle = {
            let reg = Arc::clone(&reg);
            std::thread::spawn(move || {
                reg.register_transform("t", |v, _| v);
            })
        };
        handle.join().unwrap();
        assert!(reg.contains("t"));
    }
}
