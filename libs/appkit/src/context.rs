//! Application context: the primary interface to framework services.
//!
//! An `AppContext` aggregates the service hub, the configuration provider
//! and the (optional) database handle, and exposes shortcut accessors so
//! application code does not have to spell out hub lookups for the common
//! services. It is cheap to clone and shared across handlers, listeners
//! and tests.

use std::path::PathBuf;
use std::sync::Arc;

use appkit_db::uow::{EntityKey, UnitOfWork};
use appkit_db::DbHandle;
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, EntityTrait, IntoActiveModel};

use crate::config::{parameter_as, ConfigError, ConfigProvider};
use crate::events::EventBus;
use crate::hub::{HubError, ServiceHub};
use crate::mail::{MailMessage, Mailer};
use crate::security::{Authorizer, TokenStore};
use crate::session::SessionStore;
use crate::translate::Translator;
use crate::urls::UrlGenerator;

#[derive(Clone)]
pub struct AppContext {
    hub: Arc<ServiceHub>,
    config: Arc<dyn ConfigProvider>,
    db: Option<Arc<DbHandle>>,
    uow: Option<Arc<UnitOfWork>>,
}

impl AppContext {
    #[must_use]
    pub fn new(
        hub: Arc<ServiceHub>,
        config: Arc<dyn ConfigProvider>,
        db: Option<Arc<DbHandle>>,
    ) -> Self {
        let uow = db
            .as_ref()
            .map(|handle| Arc::new(UnitOfWork::new(handle.conn().clone())));
        Self {
            hub,
            config,
            db,
            uow,
        }
    }

    // ---- container access ----

    #[inline]
    #[must_use]
    pub fn hub(&self) -> &ServiceHub {
        &self.hub
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &dyn ConfigProvider {
        &*self.config
    }

    /// Fetch any service from the hub by interface type.
    ///
    /// # Errors
    /// Returns [`HubError::NotFound`] when nothing is registered under `T`.
    pub fn service<T>(&self) -> Result<Arc<T>, HubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.hub.get::<T>()
    }

    #[must_use]
    pub fn parameter(&self, path: &str) -> Option<serde_json::Value> {
        self.config.parameter(path).cloned()
    }

    /// Typed parameter lookup.
    ///
    /// # Errors
    /// See [`parameter_as`].
    pub fn parameter_as<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ConfigError> {
        parameter_as(self.config.as_ref(), path)
    }

    /// The cache directory parameter (`app.cache_dir`), optionally extended
    /// with a relative suffix.
    ///
    /// # Errors
    /// Fails when the parameter is missing or not a string.
    pub fn cache_dir(&self, append: &str) -> Result<PathBuf, ConfigError> {
        let dir: String = self.parameter_as("app.cache_dir")?;
        let mut path = PathBuf::from(dir);
        if !append.is_empty() {
            path.push(append.trim_start_matches('/'));
        }
        Ok(path)
    }

    // ---- well-known services ----

    /// # Errors
    /// Fails when no session store is registered.
    pub fn sessions(&self) -> Result<Arc<dyn SessionStore>, HubError> {
        self.service::<dyn SessionStore>()
    }

    /// # Errors
    /// Fails when no URL generator is registered.
    pub fn urls(&self) -> Result<Arc<UrlGenerator>, HubError> {
        self.service::<UrlGenerator>()
    }

    /// # Errors
    /// Fails when no authorizer is registered.
    pub fn authorizer(&self) -> Result<Arc<dyn Authorizer>, HubError> {
        self.service::<dyn Authorizer>()
    }

    /// # Errors
    /// Fails when no token store is registered.
    pub fn token_store(&self) -> Result<Arc<TokenStore>, HubError> {
        self.service::<TokenStore>()
    }

    /// # Errors
    /// Fails when no mailer is registered.
    pub fn mailer(&self) -> Result<Arc<dyn Mailer>, HubError> {
        self.service::<dyn Mailer>()
    }

    /// # Errors
    /// Fails when no translator is registered.
    pub fn translator(&self) -> Result<Arc<dyn Translator>, HubError> {
        self.service::<dyn Translator>()
    }

    /// # Errors
    /// Fails when no event bus is registered.
    pub fn events(&self) -> Result<Arc<EventBus>, HubError> {
        self.service::<EventBus>()
    }

    // ---- shortcuts ----

    /// Check a role grant against the current token.
    ///
    /// # Errors
    /// Fails when the token store or authorizer is missing from the hub.
    pub fn is_granted(&self, role: &str) -> Result<bool, HubError> {
        let token = self.token_store()?.token();
        Ok(self.authorizer()?.is_granted(token.as_ref(), role))
    }

    /// Translate a message in the default locale.
    ///
    /// # Errors
    /// Fails when no translator is registered.
    pub fn trans(&self, key: &str, params: &[(&str, &str)]) -> Result<String, HubError> {
        Ok(self.translator()?.trans(key, params, None))
    }

    /// # Errors
    /// Fails when no mailer is registered or delivery fails.
    pub async fn send_mail(&self, message: MailMessage) -> anyhow::Result<()> {
        self.mailer()?.send(message).await
    }

    /// Dispatch an event to all registered listeners; returns the number of
    /// handlers that ran.
    ///
    /// # Errors
    /// Fails when no event bus is registered.
    pub fn dispatch<E: 'static>(&self, event: &mut E) -> Result<usize, HubError> {
        Ok(self.events()?.dispatch(event))
    }

    /// Subscribe a handler for events of type `E`.
    ///
    /// # Errors
    /// Fails when no event bus is registered.
    pub fn listen<E, F>(&self, priority: i32, handler: F) -> Result<(), HubError>
    where
        E: 'static,
        F: Fn(&mut E) + Send + Sync + 'static,
    {
        self.events()?.listen(priority, handler);
        Ok(())
    }

    // ---- database ----

    #[must_use]
    pub fn db_optional(&self) -> Option<Arc<DbHandle>> {
        self.db.clone()
    }

    /// Get the database handle or fail if not configured.
    ///
    /// # Errors
    /// Returns an error when the context was built without a database.
    pub fn db(&self) -> anyhow::Result<Arc<DbHandle>> {
        self.db
            .clone()
            .ok_or_else(|| anyhow::anyhow!("database is not configured for this application"))
    }

    /// The shared unit of work over the context's database.
    ///
    /// # Errors
    /// Returns an error when the context was built without a database.
    pub fn unit_of_work(&self) -> anyhow::Result<Arc<UnitOfWork>> {
        self.uow
            .clone()
            .ok_or_else(|| anyhow::anyhow!("database is not configured for this application"))
    }

    /// Queue an insert/update without flushing.
    ///
    /// # Errors
    /// Returns an error when the context was built without a database.
    pub fn persist<A>(&self, entity: A) -> anyhow::Result<EntityKey>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Clone + Send + Sync + 'static,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        Ok(self.unit_of_work()?.persist(entity))
    }

    /// Apply every pending operation.
    ///
    /// # Errors
    /// Returns an error when the database is missing or a flush step fails.
    pub async fn flush(&self) -> anyhow::Result<usize> {
        Ok(self.unit_of_work()?.flush(None).await?)
    }

    /// Queue an insert/update and flush. With `persist_all = false` only the
    /// given entity's queued operations are applied; with `persist_all = true`
    /// every pending operation is.
    ///
    /// # Errors
    /// Returns an error when the database is missing or a flush step fails.
    pub async fn persist_and_flush<A>(&self, entity: A, persist_all: bool) -> anyhow::Result<()>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Clone + Send + Sync + 'static,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        let uow = self.unit_of_work()?;
        let key = uow.persist(entity);
        if persist_all {
            uow.flush(None).await?;
        } else {
            uow.flush(Some(&key)).await?;
        }
        Ok(())
    }

    /// Queue a removal and flush that entity's queued operations.
    ///
    /// # Errors
    /// Returns an error when the database is missing or a flush step fails.
    pub async fn delete_and_flush<A>(&self, entity: A) -> anyhow::Result<()>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Clone + Send + Sync + 'static,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        let uow = self.unit_of_work()?;
        let key = uow.remove(entity);
        uow.flush(Some(&key)).await?;
        Ok(())
    }

    // ---- derivatives ----

    /// Derivative context with a different database handle (testing, or
    /// cross-database operations). Hub and config are shared.
    #[must_use]
    pub fn with_db(&self, db: Arc<DbHandle>) -> AppContext {
        let uow = Arc::new(UnitOfWork::new(db.conn().clone()));
        AppContext {
            hub: self.hub.clone(),
            config: self.config.clone(),
            db: Some(db),
            uow: Some(uow),
        }
    }

    /// Derivative context without database access.
    #[must_use]
    pub fn without_db(&self) -> AppContext {
        AppContext {
            hub: self.hub.clone(),
            config: self.config.clone(),
            db: None,
            uow: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FigmentConfig;
    use crate::mail::RecordingMailer;
    use crate::security::{AuthToken, RoleAuthorizer};
    use crate::session::MemorySessionStore;
    use crate::translate::CatalogTranslator;
    use serde_json::json;

    fn context() -> AppContext {
        let hub = Arc::new(ServiceHub::new());
        hub.register::<dyn SessionStore>(Arc::new(MemorySessionStore::new()));
        hub.register::<dyn Authorizer>(Arc::new(RoleAuthorizer::new()));
        hub.register::<TokenStore>(Arc::new(TokenStore::new()));
        hub.register::<dyn Mailer>(Arc::new(RecordingMailer::new()));
        hub.register::<dyn Translator>(Arc::new(CatalogTranslator::new("en")));
        hub.register::<EventBus>(Arc::new(EventBus::new()));

        let config = Arc::new(FigmentConfig::from_value(json!({
            "app": { "cache_dir": "/tmp/app-cache" }
        })));

        AppContext::new(hub, config, None)
    }

    #[test]
    fn well_known_accessors_resolve_registered_services() {
        let ctx = context();
        assert!(ctx.sessions().is_ok());
        assert!(ctx.authorizer().is_ok());
        assert!(ctx.token_store().is_ok());
        assert!(ctx.mailer().is_ok());
        assert!(ctx.translator().is_ok());
        assert!(ctx.events().is_ok());
        assert!(ctx.urls().is_err()); // not registered above
    }

    #[test]
    fn cache_dir_appends_relative_suffix() {
        let ctx = context();
        assert_eq!(
            ctx.cache_dir("").unwrap(),
            PathBuf::from("/tmp/app-cache")
        );
        assert_eq!(
            ctx.cache_dir("/uploads").unwrap(),
            PathBuf::from("/tmp/app-cache/uploads")
        );
    }

    #[test]
    fn is_granted_consults_token_store_and_authorizer() {
        let ctx = context();
        assert!(!ctx.is_granted("ROLE_ADMIN").unwrap());

        ctx.token_store()
            .unwrap()
            .set_token(AuthToken::anonymous(vec!["ROLE_ADMIN".to_owned()]));
        assert!(ctx.is_granted("ROLE_ADMIN").unwrap());
        assert!(!ctx.is_granted("ROLE_OTHER").unwrap());
    }

    #[test]
    fn db_accessors_fail_without_database() {
        let ctx = context();
        assert!(ctx.db().is_err());
        assert!(ctx.db_optional().is_none());
        assert!(ctx.unit_of_work().is_err());
    }

    #[test]
    fn dispatch_and_listen_round_trip() {
        struct Ping(u32);

        let ctx = context();
        ctx.listen::<Ping, _>(1, |p| p.0 += 1).unwrap();

        let mut ping = Ping(0);
        assert_eq!(ctx.dispatch(&mut ping).unwrap(), 1);
        assert_eq!(ping.0, 1);
    }
}
