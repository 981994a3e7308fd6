//! Security primitives: users, tokens, authorization.
//!
//! The token store holds the current authentication token; the authorizer
//! decides role grants against it. Both are intentionally small seams so
//! tests can drive them directly (see the functional test harness).

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Minimal user contract for authentication flows.
pub trait UserLike: Send + Sync {
    fn username(&self) -> &str;
    fn password(&self) -> &str;
    fn roles(&self) -> &[String];
}

/// An authentication token bound to a firewall.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub username: String,
    pub roles: Vec<String>,
    pub firewall: String,
    pub authenticated: bool,
}

impl AuthToken {
    /// Token for a fully authenticated user.
    #[must_use]
    pub fn for_user(user: &dyn UserLike, firewall: &str) -> Self {
        Self {
            username: user.username().to_owned(),
            roles: user.roles().to_vec(),
            firewall: firewall.to_owned(),
            authenticated: true,
        }
    }

    /// Anonymous token carrying only the given roles.
    #[must_use]
    pub fn anonymous(roles: Vec<String>) -> Self {
        Self {
            username: "anon".to_owned(),
            roles,
            firewall: "main".to_owned(),
            authenticated: false,
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Holder of the current authentication token.
#[derive(Default)]
pub struct TokenStore {
    current: RwLock<Option<AuthToken>>,
}

impl TokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&self, token: AuthToken) {
        *self.current.write() = Some(token);
    }

    #[must_use]
    pub fn token(&self) -> Option<AuthToken> {
        self.current.read().clone()
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }
}

/// Role grant decisions against the current token.
pub trait Authorizer: Send + Sync {
    fn is_granted(&self, token: Option<&AuthToken>, role: &str) -> bool;
}

/// Grants a role iff the token carries it. No token, no grant.
#[derive(Default)]
pub struct RoleAuthorizer;

impl RoleAuthorizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Authorizer for RoleAuthorizer {
    fn is_granted(&self, token: Option<&AuthToken>, role: &str) -> bool {
        token.is_some_and(|t| t.has_role(role))
    }
}
