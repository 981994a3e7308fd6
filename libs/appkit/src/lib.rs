//! Core application helpers: service hub, configuration, context and the
//! contracts the rest of the stack builds on (sessions, security, mail,
//! translation, events, URL generation).
//!
//! The usual entry point is [`AppContext`]: build a [`ServiceHub`], register
//! infrastructure under its interface types, attach a config provider and an
//! optional database handle, then pass the context around.

pub mod config;
pub mod context;
pub mod events;
pub mod hub;
pub mod mail;
pub mod security;
pub mod session;
pub mod translate;
pub mod urls;

pub use config::{parameter_as, ConfigError, ConfigProvider, FigmentConfig};
pub use context::AppContext;
pub use events::EventBus;
pub use hub::{HubError, ServiceHub};
pub use mail::{MailMessage, Mailer, RecordingMailer};
pub use security::{AuthToken, Authorizer, RoleAuthorizer, TokenStore, UserLike};
pub use session::{MemorySessionStore, Session, SessionStore, DEFAULT_SESSION_COOKIE};
pub use translate::{CatalogTranslator, Translator};
pub use urls::{UrlError, UrlGenerator};
