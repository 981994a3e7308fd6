//! Request-scoped service resolution.
//!
//! One [`RequestScope`] is created per HTTP request; resolved services are
//! memoized for the lifetime of the scope, so repeated lookups within a
//! handler hit the hub lock once. Dropping the scope at the end of the
//! request discards the cache.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use appkit::{AppContext, HubError, Session};
use parking_lot::Mutex;

use crate::error::HttpHelperError;

pub struct RequestScope {
    ctx: AppContext,
    cache: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    locale: Option<String>,
    session: Mutex<Option<Session>>,
}

impl RequestScope {
    #[must_use]
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            cache: Mutex::new(HashMap::new()),
            locale: None,
            session: Mutex::new(None),
        }
    }

    /// Attach the request locale (e.g. from `Accept-Language`).
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn ctx(&self) -> &AppContext {
        &self.ctx
    }

    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Resolve a service, memoized per request.
    ///
    /// # Errors
    /// Returns [`HubError::NotFound`] when nothing is registered under `T`.
    pub fn get<T>(&self) -> Result<Arc<T>, HubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeId::of::<T>();
        {
            let cache = self.cache.lock();
            if let Some(entry) = cache.get(&key) {
                if let Some(arc) = entry.downcast_ref::<Arc<T>>() {
                    return Ok(arc.clone());
                }
            }
        }

        let resolved = self.ctx.hub().get::<T>()?;
        self.cache.lock().insert(key, Box::new(resolved.clone()));
        Ok(resolved)
    }

    /// Number of memoized services (diagnostics, tests).
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    // ---- session ----

    pub fn set_session(&self, session: Session) {
        *self.session.lock() = Some(session);
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session.lock().clone()
    }

    pub fn take_session(&self) -> Option<Session> {
        self.session.lock().take()
    }

    /// Queue a translated flash message under `"success"` in the scope's
    /// session, creating and persisting one if the request had none.
    ///
    /// # Errors
    /// Fails when the session store or translator is missing from the hub.
    pub fn add_success_message(
        &self,
        message: &str,
        params: &[(&str, &str)],
    ) -> Result<(), HttpHelperError> {
        let store = self.ctx.sessions()?;
        let translated = self
            .ctx
            .translator()?
            .trans(message, params, self.locale.as_deref());

        let mut guard = self.session.lock();
        let session = guard.get_or_insert_with(|| store.create());
        session.add_flash("success", translated);
        store.save(session);
        Ok(())
    }
}
