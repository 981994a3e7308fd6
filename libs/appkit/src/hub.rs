//! Type-safe service hub.
//!
//! The hub is the process-wide service registry: providers register an
//! implementation once, consumers fetch it by *interface type* (usually a
//! trait object) without knowing the concrete implementation.
//!
//! Typical flows:
//! - During application bootstrap, infrastructure registers its services
//!   (session store, mailer, translator, authorizer, URL generator).
//! - Handlers and helpers resolve those interfaces through [`AppContext`]
//!   accessors and keep the returned `Arc` for reuse.
//! - In tests, the hub is populated with in-memory implementations under
//!   the same interface types.
//!
//! Implementation details:
//! - Key = fully-qualified `type_name::<T>()`, which works for `T = dyn Trait`.
//! - Value = `Arc<T>` stored as `Box<dyn Any + Send + Sync>` (downcast on read).
//! - Re-registering overwrites the previous value; existing `Arc`s held by
//!   consumers remain valid.
//!
//! [`AppContext`]: crate::context::AppContext

use parking_lot::RwLock;
use std::{any::Any, collections::HashMap, fmt, sync::Arc};

/// Stable type key for trait objects.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct ServiceKey(&'static str);

impl ServiceKey {
    #[inline]
    fn of<T: ?Sized + 'static>() -> Self {
        ServiceKey(std::any::type_name::<T>())
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("service not found: {0:?}")]
    NotFound(ServiceKey),

    #[error("type mismatch in hub for {0:?}")]
    TypeMismatch(ServiceKey),
}

type Boxed = Box<dyn Any + Send + Sync>;

/// Registry of singleton services keyed by interface type.
pub struct ServiceHub {
    map: RwLock<HashMap<ServiceKey, Boxed>>,
}

impl ServiceHub {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Register a service under the interface type `T`.
    /// `T` can be a trait object like `dyn SessionStore`.
    pub fn register<T>(&self, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let mut w = self.map.write();
        w.insert(ServiceKey::of::<T>(), Box::new(service));
    }

    /// Fetch a service by interface type `T`.
    ///
    /// # Errors
    /// Returns [`HubError::NotFound`] when nothing is registered under `T`.
    pub fn get<T>(&self) -> Result<Arc<T>, HubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<T>();
        let r = self.map.read();

        let boxed = r.get(&key).ok_or_else(|| HubError::NotFound(key.clone()))?;

        // Stored value is exactly `Arc<T>`; downcast is cheap.
        if let Some(arc_t) = boxed.downcast_ref::<Arc<T>>() {
            return Ok(arc_t.clone());
        }
        Err(HubError::TypeMismatch(key))
    }

    /// Remove a service; returns it if it was present.
    pub fn remove<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let mut w = self.map.write();
        let boxed = w.remove(&ServiceKey::of::<T>())?;
        boxed.downcast::<Arc<T>>().ok().map(|b| *b)
    }

    /// Clear everything (useful in tests).
    pub fn clear(&self) {
        self.map.write().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Default for ServiceHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_owned()
        }
    }

    struct Spanish;
    impl Greeter for Spanish {
        fn greet(&self) -> String {
            "hola".to_owned()
        }
    }

    #[test]
    fn register_and_get_dyn_trait() {
        let hub = ServiceHub::new();
        let svc: Arc<dyn Greeter> = Arc::new(English);
        hub.register::<dyn Greeter>(svc.clone());

        let got = hub.get::<dyn Greeter>().unwrap();
        assert_eq!(got.greet(), "hello");
        assert_eq!(Arc::as_ptr(&svc), Arc::as_ptr(&got));
    }

    #[test]
    fn get_unregistered_is_not_found() {
        let hub = ServiceHub::new();
        let err = hub.get::<dyn Greeter>().err().unwrap();
        assert!(matches!(err, HubError::NotFound(_)));
        assert!(err.to_string().contains("Greeter"));
    }

    #[test]
    fn re_registering_overwrites_but_keeps_existing_arcs_valid() {
        let hub = ServiceHub::new();
        hub.register::<dyn Greeter>(Arc::new(English));
        let first = hub.get::<dyn Greeter>().unwrap();

        hub.register::<dyn Greeter>(Arc::new(Spanish));
        let second = hub.get::<dyn Greeter>().unwrap();

        assert_eq!(first.greet(), "hello");
        assert_eq!(second.greet(), "hola");
    }

    #[test]
    fn remove_makes_service_unavailable() {
        let hub = ServiceHub::new();
        hub.register::<dyn Greeter>(Arc::new(English));

        let removed = hub.remove::<dyn Greeter>();
        assert!(removed.is_some());
        assert!(hub.get::<dyn Greeter>().is_err());
    }

    #[test]
    fn concrete_types_and_trait_objects_coexist() {
        struct Counter(u32);

        let hub = ServiceHub::new();
        hub.register::<dyn Greeter>(Arc::new(English));
        hub.register::<Counter>(Arc::new(Counter(7)));

        assert_eq!(hub.len(), 2);
        assert_eq!(hub.get::<Counter>().unwrap().0, 7);
        assert_eq!(hub.get::<dyn Greeter>().unwrap().greet(), "hello");
    }

    #[test]
    fn clear_empties_the_hub() {
        let hub = ServiceHub::new();
        hub.register::<dyn Greeter>(Arc::new(English));
        assert!(!hub.is_empty());

        hub.clear();
        assert!(hub.is_empty());
        assert!(hub.get::<dyn Greeter>().is_err());
    }
}
