//! Caller identity for the `controller` label.
//!
//! A [`CallerResolver`] names the subsystem issuing a request. Two
//! resolvers are provided:
//!
//! - [`FixedCaller`] - one identity per monitor, for subsystems that own
//!   their client
//! - [`ScopedCaller`] - reads the innermost caller scope entered with
//!   [`scope`], [`sync_scope`] or [`caller_scope!`](crate::caller_scope)
//!   and maps the recorded module path to a short id through a
//!   [`ControllerRegistry`]
//!
//! Scopes are task-local: a task spawned from inside a scope does not
//! inherit it and must enter its own.
//!
//! ```rust,ignore
//! async fn reconcile(client: &InstrumentedClient<Store>) -> Result<(), StoreError> {
//!     caller_scope!(async {
//!         client.get(&key, &mut app).await
//!     })
//!     .await
//! }
//! ```

use std::future::Future;
use tracing::debug;

/// Controller label used when no caller can be identified.
pub const UNKNOWN_CONTROLLER: &str = "unknown";

tokio::task_local! {
    static CALLER_MODULE: &'static str;
}

/// Resolves the controller id of the current caller.
pub trait CallerResolver: Send + Sync {
    /// Controller id, `None` when the caller cannot be identified.
    fn controller_id(&self) -> Option<String>;
}

/// Run `f` with `module` recorded as the current caller.
pub async fn scope<F: Future>(module: &'static str, f: F) -> F::Output {
    CALLER_MODULE.scope(module, f).await
}

/// Synchronous variant of [`scope`].
pub fn sync_scope<R>(module: &'static str, f: impl FnOnce() -> R) -> R {
    CALLER_MODULE.sync_scope(module, f)
}

/// Module path of the innermost caller scope, if any.
#[must_use]
pub fn current_module() -> Option<&'static str> {
    CALLER_MODULE.try_with(|module| *module).ok()
}

/// Enter a caller scope named after the invoking module.
#[macro_export]
macro_rules! caller_scope {
    ($fut:expr) => {
        $crate::caller::scope(::core::module_path!(), $fut)
    };
}

/// A resolver that always reports the same controller.
#[derive(Debug, Clone)]
pub struct FixedCaller {
    id: String,
}

impl FixedCaller {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl CallerResolver for FixedCaller {
    fn controller_id(&self) -> Option<String> {
        Some(self.id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ControllerEntry {
    id: String,
    module_prefix: String,
}

/// Closed set of controllers, keyed by the module that owns them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerRegistry {
    entries: Vec<ControllerEntry>,
}

impl ControllerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` for every module under `module_prefix`.
    #[must_use]
    pub fn register(mut self, id: impl Into<String>, module_prefix: impl Into<String>) -> Self {
        self.insert(id, module_prefix);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, module_prefix: impl Into<String>) {
        self.entries.push(ControllerEntry {
            id: id.into(),
            module_prefix: module_prefix.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Registered controller ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.id.as_str())
    }

    /// Controller owning `module_path`, by longest matching prefix.
    ///
    /// Prefixes match whole `::` segments: `app::ctrl` owns
    /// `app::ctrl::reconcile` but not `app::ctrl_v2`.
    #[must_use]
    pub fn resolve(&self, module_path: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|entry| is_module_prefix(&entry.module_prefix, module_path))
            .max_by_key(|entry| entry.module_prefix.len())
            .map(|entry| entry.id.as_str())
    }
}

fn is_module_prefix(prefix: &str, module_path: &str) -> bool {
    match module_path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}

/// Resolves the caller from the innermost task-local caller scope.
#[derive(Debug, Clone)]
pub struct ScopedCaller {
    registry: ControllerRegistry,
}

impl ScopedCaller {
    #[must_use]
    pub fn new(registry: ControllerRegistry) -> Self {
        Self { registry }
    }
}

impl CallerResolver for ScopedCaller {
    fn controller_id(&self) -> Option<String> {
        let module = current_module()?;
        let id = self.registry.resolve(module);
        if id.is_none() {
            debug!(
                target: "client_monitor.caller",
                module = module,
                "No registered controller for caller module"
            );
        }
        id.map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ControllerRegistry {
        ControllerRegistry::new()
            .register("app", "operator::controllers::application")
            .register("workflow", "operator::controllers::workflow")
            .register("step", "operator::controllers::workflow::steps")
    }

    #[test]
    fn test_fixed_caller() {
        assert_eq!(FixedCaller::new("gc").controller_id().as_deref(), Some("gc"));
    }

    #[test]
    fn test_registry_exact_and_nested_match() {
        let registry = registry();
        assert_eq!(
            registry.resolve("operator::controllers::application"),
            Some("app")
        );
        assert_eq!(
            registry.resolve("operator::controllers::application::sync"),
            Some("app")
        );
    }

    #[test]
    fn test_registry_longest_prefix_wins() {
        let registry = registry();
        assert_eq!(
            registry.resolve("operator::controllers::workflow::steps::apply"),
            Some("step")
        );
        assert_eq!(
            registry.resolve("operator::controllers::workflow::engine"),
            Some("workflow")
        );
    }

    #[test]
    fn test_registry_requires_segment_boundary() {
        let registry = registry();
        assert_eq!(registry.resolve("operator::controllers::application_v2"), None);
        assert_eq!(registry.resolve("operator::webhooks"), None);
    }

    #[test]
    fn test_registry_accessors() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
        assert_eq!(
            registry.ids().collect::<Vec<_>>(),
            vec!["app", "workflow", "step"]
        );
        assert!(ControllerRegistry::new().is_empty());
    }

    #[test]
    fn test_scoped_caller_outside_scope() {
        let resolver = ScopedCaller::new(registry());
        assert_eq!(current_module(), None);
        assert_eq!(resolver.controller_id(), None);
    }

    #[test]
    fn test_scoped_caller_sync_scope() {
        let resolver = ScopedCaller::new(registry());
        let id = sync_scope("operator::controllers::application::sync", || {
            resolver.controller_id()
        });
        assert_eq!(id.as_deref(), Some("app"));
    }

    #[test]
    fn test_scoped_caller_unregistered_module() {
        let resolver = ScopedCaller::new(registry());
        let id = sync_scope("operator::webhooks::validate", || resolver.controller_id());
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn test_scoped_caller_innermost_scope_wins() {
        let resolver = ScopedCaller::new(registry());
        let (outer, inner) = scope("operator::controllers::workflow", async {
            let outer = resolver.controller_id();
            let inner = scope("operator::controllers::application", async {
                resolver.controller_id()
            })
            .await;
            (outer, inner)
        })
        .await;

        assert_eq!(outer.as_deref(), Some("workflow"));
        assert_eq!(inner.as_deref(), Some("app"));
    }

    #[tokio::test]
    async fn test_caller_scope_macro_records_module_path() {
        let module = crate::caller_scope!(async { current_module() }).await;
        assert_eq!(module, Some(module_path!()));
    }
}
