//! Configuration types

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::protocol::mysql::DEFAULT_SERVER_VERSION;

/// Root configuration structure
///
/// ```yaml
/// server:
///   listen_port: 3307
///
/// users:
///   - username: root
///     password: "${ROOT_PASSWORD}"
///     authorized_schemas: [sharding_db]
///
/// schemas:
///   sharding_db:
///     data_sources: [ds_0, ds_1]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Proxy accounts clients log in with
    #[serde(default)]
    pub users: Vec<UserConfig>,

    /// Logical schemas, keyed by name
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Look up a configured user by exact name
    pub fn get_user(&self, username: &str) -> Option<&UserConfig> {
        self.users.iter().find(|u| u.username == username)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.users.is_empty() {
            return Err("At least one user must be configured".to_string());
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            if user.username.is_empty() {
                return Err("User entries must have a non-empty username".to_string());
            }
            if !seen.insert(user.username.as_str()) {
                return Err(format!("Duplicate user '{}'", user.username));
            }
            for schema in &user.authorized_schemas {
                if !self.schemas.contains_key(schema) {
                    return Err(format!(
                        "User '{}' is authorized for unknown schema '{}'",
                        user.username, schema
                    ));
                }
            }
        }

        if self.schemas.keys().any(|name| name.is_empty()) {
            return Err("Schema names must not be empty".to_string());
        }

        Ok(())
    }
}

/// Server listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Port to listen on
    pub listen_port: u16,
    /// Version string announced in the greeting
    #[serde(default = "default_server_version")]
    pub server_version: String,
    /// Deadline for completing the authentication handshake, in seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,
    /// Maximum number of concurrent connections (0 = unlimited)
    #[serde(default)]
    pub max_connections: usize,
}

/// A proxy account.
#[derive(Clone, Deserialize)]
pub struct UserConfig {
    /// Login name
    pub username: String,
    /// Plaintext password; empty means password-less
    #[serde(default)]
    pub password: String,
    /// Schemas this user may select; empty grants all
    #[serde(default)]
    pub authorized_schemas: Vec<String>,
}

impl fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("authorized_schemas", &self.authorized_schemas)
            .finish()
    }
}

/// A logical schema definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    /// Names of the data sources backing the schema
    #[serde(default)]
    pub data_sources: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to log protocol details
    #[serde(default)]
    pub protocol_debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            protocol_debug: false,
        }
    }
}

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}

fn default_server_version() -> String {
    DEFAULT_SERVER_VERSION.to_string()
}

fn default_handshake_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}
