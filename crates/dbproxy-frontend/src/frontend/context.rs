//! Per-connection handshake state.

use crate::protocol::mysql::{CapabilityFlags, HandshakeResponse41, SCRAMBLE_LENGTH};

/// State captured when the greeting is sent.
///
/// The scramble is fixed for the life of the connection; the switch round
/// verifies against the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeContext {
    connection_id: u32,
    scramble: [u8; SCRAMBLE_LENGTH],
    capabilities: CapabilityFlags,
}

impl HandshakeContext {
    /// Create a context. Capabilities start as the server's advertised set
    /// until the client's response is observed.
    pub fn new(connection_id: u32, scramble: [u8; SCRAMBLE_LENGTH]) -> Self {
        Self {
            connection_id,
            scramble,
            capabilities: CapabilityFlags::server_default(),
        }
    }

    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    pub fn scramble(&self) -> &[u8; SCRAMBLE_LENGTH] {
        &self.scramble
    }

    /// Capabilities from the client's handshake response, or the server
    /// default before one arrives
    pub fn capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    pub(crate) fn observe_capabilities(&mut self, capabilities: CapabilityFlags) {
        self.capabilities = capabilities;
    }
}

/// What the client asked for in its handshake response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthAttempt {
    pub username: String,
    pub database: Option<String>,
    /// Scrambled password; replaced by the switch response after a mismatch
    pub auth_response: Vec<u8>,
    pub auth_plugin_name: Option<String>,
}

impl AuthAttempt {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_auth_response(mut self, auth_response: Vec<u8>) -> Self {
        self.auth_response = auth_response;
        self
    }

    pub fn with_auth_plugin_name(mut self, plugin: impl Into<String>) -> Self {
        self.auth_plugin_name = Some(plugin.into());
        self
    }

    /// "YES"/"NO" as shown in access-denied messages
    pub fn using_password(&self) -> &'static str {
        if self.auth_response.is_empty() {
            "NO"
        } else {
            "YES"
        }
    }
}

impl From<HandshakeResponse41> for AuthAttempt {
    fn from(response: HandshakeResponse41) -> Self {
        Self {
            username: response.username,
            database: response.database,
            auth_response: response.auth_response,
            auth_plugin_name: response.auth_plugin_name,
        }
    }
}
