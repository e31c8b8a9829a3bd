//! AuthenticationHandler trait definition.

use crate::protocol::mysql::{ServerErrorCode, MYSQL_NATIVE_PASSWORD};

/// A single login attempt.
///
/// The scramble is the one issued in the connection's greeting; the switch
/// round reuses it.
#[derive(Debug, Clone, Copy)]
pub struct LoginRequest<'a> {
    /// Username the client logged in as
    pub username: &'a str,
    /// Client host, for error messages
    pub host: &'a str,
    /// Scrambled password bytes
    pub auth_response: &'a [u8],
    /// Requested database, already resolved against the schema registry
    pub database: Option<&'a str>,
    /// Scramble the response was computed against
    pub scramble: &'a [u8],
}

/// Trait for pluggable login checks.
///
/// Handlers are synchronous: the engine calls them inline while processing a
/// packet, so implementations must not block on I/O.
pub trait AuthenticationHandler: Send + Sync {
    /// Check a login attempt.
    ///
    /// Returns the error code to report to the client on failure.
    fn login(&self, request: &LoginRequest<'_>) -> Result<(), ServerErrorCode>;

    /// Plugin the handler verifies responses for.
    ///
    /// Clients that negotiate any other plugin are asked to switch.
    fn auth_plugin_name(&self) -> &str {
        MYSQL_NATIVE_PASSWORD
    }

    /// Whether an authenticated user may switch to `schema`.
    fn authorize_schema(&self, _username: &str, _schema: &str) -> bool {
        true
    }
}
