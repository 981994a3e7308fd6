//! Functional test application.
//!
//! [`TestApp::boot`] stands in for the framework kernel: it connects and
//! provisions the database (when configured), registers the baseline
//! services in a fresh hub, builds the router against the resulting
//! [`AppContext`] and wraps it in a [`TestClient`]. [`TestApp::teardown`]
//! drops the provisioned schema again, bracketing the test run.

use std::path::Path;
use std::sync::Arc;

use appkit::{
    AppContext, AuthToken, Authorizer, CatalogTranslator, EventBus, FigmentConfig, Mailer,
    MemorySessionStore, RecordingMailer, RoleAuthorizer, ServiceHub, SessionStore, TokenStore,
    Translator, UrlGenerator, UserLike,
};
use appkit_db::{ConnectOpts, DbHandle, SchemaProvisioner};
use axum::Router;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use sea_orm_migration::{MigrationTrait, MigratorTrait};
use tracing::debug;
use uuid::Uuid;

use crate::client::TestClient;
use crate::commands::CommandRegistry;
use crate::files::{DummyFile, DummyUploadedFile};
use crate::fixtures::Fixture;

/// Migrator for applications booted without database entities.
pub struct NoMigrations;

impl MigratorTrait for NoMigrations {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        Vec::new()
    }
}

pub struct TestAppConfig {
    /// DSN of the test database; `None` boots without one.
    pub database: Option<String>,
    /// Create + force-update the schema on boot, drop it on teardown.
    pub provision_schema: bool,
    /// Base URL for absolute route generation.
    pub base_url: String,
    /// Firewall name used by the simulated login.
    pub firewall: String,
    /// Application parameters (`app.cache_dir` gets a per-app temp default).
    pub parameters: serde_json::Value,
}

impl Default for TestAppConfig {
    fn default() -> Self {
        Self {
            database: None,
            provision_schema: true,
            base_url: "http://localhost".to_owned(),
            firewall: "main".to_owned(),
            parameters: serde_json::json!({}),
        }
    }
}

impl TestAppConfig {
    /// Config for tests backed by an in-memory SQLite database.
    #[must_use]
    pub fn with_memory_database() -> Self {
        Self {
            database: Some("sqlite::memory:".to_owned()),
            ..Self::default()
        }
    }
}

pub struct TestApp {
    ctx: AppContext,
    client: TestClient,
    urls: Arc<UrlGenerator>,
    firewall: String,
    provisioned: bool,
}

impl TestApp {
    /// Boot the application under test.
    ///
    /// The router is built *after* the context exists so handlers can close
    /// over it (axum state or extensions).
    ///
    /// # Errors
    /// Fails when the database cannot be connected or provisioned.
    pub async fn boot<M, F>(config: TestAppConfig, make_router: F) -> anyhow::Result<Self>
    where
        M: MigratorTrait,
        F: FnOnce(&AppContext) -> Router,
    {
        let db = match &config.database {
            Some(dsn) => Some(Arc::new(
                DbHandle::connect(dsn, ConnectOpts::default()).await?,
            )),
            None => None,
        };

        let mut provisioned = false;
        if let Some(db) = &db {
            if config.provision_schema {
                SchemaProvisioner::provision::<M>(db.conn()).await?;
                provisioned = true;
            }
        }

        let hub = Arc::new(ServiceHub::new());
        hub.register::<dyn SessionStore>(Arc::new(MemorySessionStore::new()));
        hub.register::<TokenStore>(Arc::new(TokenStore::new()));
        hub.register::<dyn Authorizer>(Arc::new(RoleAuthorizer::new()));
        hub.register::<dyn Translator>(Arc::new(CatalogTranslator::new("en")));
        hub.register::<dyn Mailer>(Arc::new(RecordingMailer::new()));
        hub.register::<EventBus>(Arc::new(EventBus::new()));
        hub.register::<CommandRegistry>(Arc::new(CommandRegistry::new()));

        let urls = Arc::new(UrlGenerator::new(config.base_url.clone()));
        hub.register::<UrlGenerator>(urls.clone());

        let parameters = with_default_cache_dir(config.parameters)?;
        let ctx = AppContext::new(hub, Arc::new(FigmentConfig::from_value(parameters)), db);

        let router = make_router(&ctx);
        let client = TestClient::new(router).with_urls(urls.clone());

        debug!(provisioned, "test application booted");
        Ok(Self {
            ctx,
            client,
            urls,
            firewall: config.firewall,
            provisioned,
        })
    }

    /// Boot without any database entities.
    ///
    /// # Errors
    /// See [`boot`](Self::boot).
    pub async fn boot_without_db<F>(config: TestAppConfig, make_router: F) -> anyhow::Result<Self>
    where
        F: FnOnce(&AppContext) -> Router,
    {
        Self::boot::<NoMigrations, F>(
            TestAppConfig {
                database: None,
                ..config
            },
            make_router,
        )
        .await
    }

    /// Drop provisioned schema objects and shut the application down.
    ///
    /// # Errors
    /// Surfaces rollback failures.
    pub async fn teardown<M: MigratorTrait>(self) -> anyhow::Result<()> {
        if self.provisioned {
            if let Some(db) = self.ctx.db_optional() {
                SchemaProvisioner::drop_all::<M>(db.conn()).await?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn ctx(&self) -> &AppContext {
        &self.ctx
    }

    #[must_use]
    pub fn client(&self) -> &TestClient {
        &self.client
    }

    #[must_use]
    pub fn urls(&self) -> &Arc<UrlGenerator> {
        &self.urls
    }

    /// The console command registry, for registering commands under test.
    ///
    /// # Errors
    /// Fails when the registry is missing from the hub.
    pub fn commands(&self) -> anyhow::Result<Arc<CommandRegistry>> {
        Ok(self.ctx.service::<CommandRegistry>()?)
    }

    /// Simulate authentication: place the user's token in the token store,
    /// mirror it (serialized) into a saved session under
    /// `_security_<firewall>`, and plant the session cookie in the client's
    /// jar. No real login flow runs.
    ///
    /// # Errors
    /// Fails when session or token services are missing.
    pub fn login_user(&self, user: &dyn UserLike) -> anyhow::Result<AuthToken> {
        let token = AuthToken::for_user(user, &self.firewall);
        self.ctx.token_store()?.set_token(token.clone());

        let store = self.ctx.sessions()?;
        let mut session = store.create();
        session.set(
            format!("_security_{}", self.firewall),
            serde_json::to_string(&token)?,
        );
        store.save(&session);

        self.client.set_cookie(store.cookie_name(), session.id());
        Ok(token)
    }

    /// Set an anonymous token carrying only the given roles.
    ///
    /// # Errors
    /// Fails when the token store is missing.
    pub fn login_anonymous(&self, roles: Vec<String>) -> anyhow::Result<AuthToken> {
        let token = AuthToken::anonymous(roles);
        self.ctx.token_store()?.set_token(token.clone());
        Ok(token)
    }

    /// Load fixtures in order.
    ///
    /// # Errors
    /// Fails without a database or when a fixture fails.
    pub async fn load_fixtures(&self, fixtures: &[&dyn Fixture]) -> anyhow::Result<()> {
        let db = self.ctx.db()?;
        for fixture in fixtures {
            fixture.load(db.conn()).await?;
        }
        Ok(())
    }

    /// Run a registered console command, returning its captured output.
    ///
    /// # Errors
    /// Fails for unknown commands or when the command fails.
    pub async fn run_command(&self, name: &str, args: &[&str]) -> anyhow::Result<String> {
        self.commands()?.run_captured(name, args).await
    }

    /// Fetch one row by column equality (e.g. a user by username).
    ///
    /// # Errors
    /// Fails without a database or when no row matches.
    pub async fn find_one_where<E>(
        &self,
        col: E::Column,
        value: impl Into<sea_orm::Value> + Send,
    ) -> anyhow::Result<E::Model>
    where
        E: EntityTrait,
    {
        let db = self.ctx.db()?;
        E::find()
            .filter(col.eq(value))
            .one(db.conn())
            .await?
            .ok_or_else(|| anyhow::anyhow!("no row matched the given criteria"))
    }

    /// Copy a file into the app cache dir and wrap it for cleanup.
    ///
    /// # Errors
    /// Fails when the cache dir is unavailable or the copy fails.
    pub fn create_dummy_file(&self, source: &Path) -> anyhow::Result<DummyFile> {
        let dir = self.ctx.cache_dir("")?;
        std::fs::create_dir_all(&dir)?;
        Ok(DummyFile::copy_into(source, &dir)?)
    }

    /// Like [`create_dummy_file`](Self::create_dummy_file), promoted to an
    /// upload fixture.
    ///
    /// # Errors
    /// Same failure modes as [`create_dummy_file`](Self::create_dummy_file).
    pub fn create_dummy_uploaded_file(&self, source: &Path) -> anyhow::Result<DummyUploadedFile> {
        Ok(DummyUploadedFile::from_file(self.create_dummy_file(source)?))
    }
}

/// Ensure `app.cache_dir` exists in the parameters, defaulting to a
/// per-application temp directory.
fn with_default_cache_dir(
    mut parameters: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    if !parameters.is_object() {
        parameters = serde_json::json!({});
    }

    let has_cache_dir = parameters
        .pointer("/app/cache_dir")
        .is_some_and(serde_json::Value::is_string);

    if !has_cache_dir {
        let dir = std::env::temp_dir().join(format!("appkit-test-{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir)?;

        let root = parameters
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("parameters must be a JSON object"))?;
        let app = root
            .entry("app")
            .or_insert_with(|| serde_json::json!({}));
        if let Some(app) = app.as_object_mut() {
            app.insert(
                "cache_dir".to_owned(),
                serde_json::Value::String(dir.to_string_lossy().into_owned()),
            );
        }
    }

    Ok(parameters)
}
