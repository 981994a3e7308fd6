//! Dummy authenticated user.

use appkit::UserLike;

/// A user whose only interesting property is its role set. Username and
/// password are fixed to `"test"`.
pub struct DummyUser {
    roles: Vec<String>,
}

impl DummyUser {
    #[must_use]
    pub fn new(roles: Vec<String>) -> Self {
        Self { roles }
    }

    /// Single-role convenience constructor.
    #[must_use]
    pub fn with_role(role: impl Into<String>) -> Self {
        Self::new(vec![role.into()])
    }
}

impl UserLike for DummyUser {
    fn username(&self) -> &str {
        "test"
    }

    fn password(&self) -> &str {
        "test"
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_identity_with_configurable_roles() {
        let user = DummyUser::with_role("ROLE_ADMIN");
        assert_eq!(user.username(), "test");
        assert_eq!(user.password(), "test");
        assert_eq!(user.roles(), ["ROLE_ADMIN".to_owned()]);

        let user = DummyUser::new(vec!["ROLE_A".to_owned(), "ROLE_B".to_owned()]);
        assert_eq!(user.roles().len(), 2);
    }
}
