//! Proxy accounts.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::protocol::mysql::verify_native_password;

/// A proxy account clients log in with.
#[derive(Clone)]
pub struct ProxyUser {
    username: String,
    password: Zeroizing<String>,
    authorized_schemas: HashSet<String>,
}

impl ProxyUser {
    /// Create a user authorized for every schema
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
            authorized_schemas: HashSet::new(),
        }
    }

    /// Restrict the user to the given schemas. An empty set grants all.
    pub fn with_authorized_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_schemas = schemas.into_iter().map(Into::into).collect();
        self
    }

    /// Login name
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether the account has no password
    pub fn has_empty_password(&self) -> bool {
        self.password.is_empty()
    }

    /// Check a `mysql_native_password` response against this account.
    ///
    /// A password-less account accepts only an empty response.
    pub fn verify(&self, scramble: &[u8], auth_response: &[u8]) -> bool {
        if self.password.is_empty() {
            return auth_response.is_empty();
        }
        verify_native_password(&self.password, scramble, auth_response)
    }

    /// Whether the user may use `schema`
    pub fn is_authorized_for(&self, schema: &str) -> bool {
        self.authorized_schemas.is_empty() || self.authorized_schemas.contains(schema)
    }
}

impl fmt::Debug for ProxyUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyUser")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("authorized_schemas", &self.authorized_schemas)
            .finish()
    }
}

type UserMap = HashMap<String, Arc<ProxyUser>>;

/// Hot-reloadable set of proxy accounts, keyed by username.
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: RwLock<Arc<UserMap>>,
}

impl UserRegistry {
    /// Create a registry from a list of users. Later duplicates win.
    pub fn new(users: impl IntoIterator<Item = ProxyUser>) -> Self {
        Self {
            users: RwLock::new(Arc::new(Self::index(users))),
        }
    }

    /// Create a registry from the `users` section of the configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(Self::users_from_config(config))
    }

    /// Build the user list described by a configuration
    pub fn users_from_config(config: &Config) -> Vec<ProxyUser> {
        config
            .users
            .iter()
            .map(|u| {
                ProxyUser::new(u.username.clone(), u.password.clone())
                    .with_authorized_schemas(u.authorized_schemas.iter().cloned())
            })
            .collect()
    }

    /// Exact lookup by username
    pub fn get(&self, username: &str) -> Option<Arc<ProxyUser>> {
        self.users.read().get(username).cloned()
    }

    /// Number of users
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Whether no users are registered
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Replace every user at once
    pub fn reload(&self, users: impl IntoIterator<Item = ProxyUser>) {
        let users = Arc::new(Self::index(users));
        let user_count = users.len();
        *self.users.write() = users;
        info!(user_count, "User registry reloaded");
    }

    fn index(users: impl IntoIterator<Item = ProxyUser>) -> UserMap {
        users
            .into_iter()
            .map(|u| (u.username.clone(), Arc::new(u)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mysql::compute_auth_response;

    #[test]
    fn test_verify_password() {
        let user = ProxyUser::new("root", "root");
        let scramble = [7u8; 20];
        assert!(user.verify(&scramble, &compute_auth_response("root", &scramble)));
        assert!(!user.verify(&scramble, &compute_auth_response("toor", &scramble)));
        assert!(!user.verify(&scramble, &[]));
    }

    #[test]
    fn test_empty_password_accepts_only_empty_response() {
        let user = ProxyUser::new("guest", "");
        let scramble = [7u8; 20];
        assert!(user.has_empty_password());
        assert!(user.verify(&scramble, &[]));
        assert!(!user.verify(&scramble, &compute_auth_response("x", &scramble)));
    }

    #[test]
    fn test_schema_authorization() {
        let all = ProxyUser::new("a", "p");
        assert!(all.is_authorized_for("anything"));

        let limited = ProxyUser::new("b", "p").with_authorized_schemas(["sharding_db"]);
        assert!(limited.is_authorized_for("sharding_db"));
        assert!(!limited.is_authorized_for("other_db"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let user = ProxyUser::new("root", "hunter2");
        let debug = format!("{:?}", user);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_registry_reload() {
        let registry = UserRegistry::new(vec![ProxyUser::new("root", "root")]);
        let held = registry.get("root").unwrap();
        assert_eq!(registry.len(), 1);

        registry.reload(vec![ProxyUser::new("admin", "admin")]);
        assert!(registry.get("root").is_none());
        assert!(registry.get("admin").is_some());
        // Users handed out before the reload stay usable
        assert_eq!(held.username(), "root");
    }

    #[test]
    fn test_registry_lookup_is_case_sensitive() {
        let registry = UserRegistry::new(vec![ProxyUser::new("root", "root")]);
        assert!(registry.get("ROOT").is_none());
        assert!(registry.get("").is_none());
    }
}
