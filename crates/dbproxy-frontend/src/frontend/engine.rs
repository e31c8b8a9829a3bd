//! Authentication engine: drives one connection through the handshake.
//!
//! The network layer calls [`AuthenticationEngine::handshake`] once on accept
//! and [`AuthenticationEngine::auth`] for every inbound packet until the
//! engine reaches a terminal phase. Each processed packet produces exactly one
//! outbound packet. Neither call blocks: they only hash, look up and buffer.

use std::sync::Arc;

use crate::auth::{AuthenticationHandler, LoginRequest};
use crate::backend::BackendConnection;
use crate::error::{ProxyError, Result};
use crate::protocol::mysql::{
    generate_scramble, parse_auth_switch_response, parse_handshake_response41,
    CapabilityFlags, ServerErrorCode, DEFAULT_SERVER_VERSION,
};
use crate::schema::SchemaResolver;

use super::connection_id::ConnectionIdGenerator;
use super::context::{AuthAttempt, HandshakeContext};
use super::emitter::{PacketSink, ResponseEmitter};
use super::phase::ConnectionPhase;

/// Result of processing one auth packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// An auth switch request was sent; another packet is expected
    SwitchRequested,
    /// OK was sent
    Authenticated,
    /// ERR was sent with this code
    Rejected(ServerErrorCode),
}

impl AuthOutcome {
    /// Whether the handshake is over
    pub fn is_terminal(self) -> bool {
        !matches!(self, AuthOutcome::SwitchRequested)
    }
}

/// Per-connection authentication engine.
pub struct AuthenticationEngine {
    handler: Arc<dyn AuthenticationHandler>,
    schemas: Arc<dyn SchemaResolver>,
    ids: &'static ConnectionIdGenerator,
    emitter: ResponseEmitter,
    client_host: String,
    phase: ConnectionPhase,
    context: Option<HandshakeContext>,
    attempt: Option<AuthAttempt>,
    auth_response: Vec<u8>,
}

impl AuthenticationEngine {
    pub fn new(handler: Arc<dyn AuthenticationHandler>, schemas: Arc<dyn SchemaResolver>) -> Self {
        Self {
            handler,
            schemas,
            ids: ConnectionIdGenerator::global(),
            emitter: ResponseEmitter::new(DEFAULT_SERVER_VERSION),
            client_host: "localhost".to_string(),
            phase: ConnectionPhase::Initial,
            context: None,
            attempt: None,
            auth_response: Vec::new(),
        }
    }

    /// Server version announced in the greeting
    pub fn with_server_version(mut self, server_version: impl Into<String>) -> Self {
        self.emitter = ResponseEmitter::new(server_version);
        self
    }

    /// Client host shown in access-denied messages
    pub fn with_client_host(mut self, host: impl Into<String>) -> Self {
        self.client_host = host.into();
        self
    }

    /// Draw connection ids from `ids` instead of the process-wide generator
    pub fn with_id_generator(mut self, ids: &'static ConnectionIdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Start from a given handshake state, as if the greeting had been sent.
    pub fn with_handshake_state(
        mut self,
        context: HandshakeContext,
        phase: ConnectionPhase,
    ) -> Self {
        self.context = Some(context);
        self.phase = phase;
        self
    }

    /// Start with a captured first attempt, for resuming at the switch round
    pub fn with_attempt(mut self, attempt: AuthAttempt) -> Self {
        self.auth_response = attempt.auth_response.clone();
        self.attempt = Some(attempt);
        self
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn context(&self) -> Option<&HandshakeContext> {
        self.context.as_ref()
    }

    /// The last auth response captured from the client
    pub fn auth_response(&self) -> &[u8] {
        &self.auth_response
    }

    pub fn attempt(&self) -> Option<&AuthAttempt> {
        self.attempt.as_ref()
    }

    pub fn connection_id(&self) -> Option<u32> {
        self.context.as_ref().map(HandshakeContext::connection_id)
    }

    /// Capabilities to encode outbound packets with
    pub fn capabilities(&self) -> CapabilityFlags {
        self.context
            .as_ref()
            .map(HandshakeContext::capabilities)
            .unwrap_or_else(CapabilityFlags::server_default)
    }

    /// Assign a connection id, generate the scramble and send the greeting.
    ///
    /// Returns the assigned connection id.
    pub fn handshake(
        &mut self,
        sink: &mut dyn PacketSink,
        backend: &mut BackendConnection,
    ) -> Result<u32> {
        if self.context.is_some() {
            return Err(ProxyError::ProtocolViolation(
                "Handshake already performed".into(),
            ));
        }
        self.phase.transition(ConnectionPhase::FastPath)?;

        let connection_id = self.ids.next_id();
        let context = HandshakeContext::new(connection_id, generate_scramble());
        self.emitter.send_greeting(
            sink,
            connection_id,
            context.scramble(),
            CapabilityFlags::server_default(),
        );
        backend.set_connection_id(connection_id);
        self.context = Some(context);

        debug!(connection_id, "Greeting sent");
        Ok(connection_id)
    }

    /// Process one inbound packet of the connection phase.
    ///
    /// Returns [`ProxyError::ProtocolViolation`] without emitting anything when
    /// the current phase does not accept auth packets.
    pub fn auth(
        &mut self,
        sink: &mut dyn PacketSink,
        sequence_id: u8,
        payload: &[u8],
        backend: &mut BackendConnection,
    ) -> Result<AuthOutcome> {
        if self.context.is_none() {
            return Err(self.violation());
        }
        match self.phase {
            ConnectionPhase::FastPath => {
                self.emitter.reply_to(sequence_id);
                self.auth_fast_path(sink, payload, backend)
            }
            ConnectionPhase::MethodMismatch if self.attempt.is_some() => {
                self.emitter.reply_to(sequence_id);
                self.auth_switch_response(sink, payload, backend)
            }
            _ => Err(self.violation()),
        }
    }

    fn violation(&self) -> ProxyError {
        warn!(
            connection_id = self.connection_id().unwrap_or(0),
            phase = %self.phase,
            "Auth packet received out of sequence"
        );
        ProxyError::ProtocolViolation(format!("Unexpected auth packet in phase {}", self.phase))
    }

    fn auth_fast_path(
        &mut self,
        sink: &mut dyn PacketSink,
        payload: &[u8],
        backend: &mut BackendConnection,
    ) -> Result<AuthOutcome> {
        let response = match parse_handshake_response41(payload) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    connection_id = self.connection_id().unwrap_or(0),
                    error = %e,
                    "Malformed handshake response"
                );
                return self.reject(sink, ServerErrorCode::HandshakeError, &[]);
            }
        };

        let capabilities = response.capability_flags;
        if let Some(context) = self.context.as_mut() {
            context.observe_capabilities(capabilities);
        }

        let attempt = AuthAttempt::from(response);
        self.auth_response = attempt.auth_response.clone();

        let plugin = self.handler.auth_plugin_name().to_string();
        let negotiated = capabilities.supports_plugin_auth()
            && attempt.auth_plugin_name.as_deref() == Some(plugin.as_str());
        self.attempt = Some(attempt);

        if negotiated {
            return self.complete(sink, backend);
        }

        self.phase.transition(ConnectionPhase::MethodMismatch)?;
        let Some(context) = self.context.as_ref() else {
            return Err(self.violation());
        };
        let scramble = *context.scramble();
        self.emitter.send_auth_switch_request(sink, &plugin, &scramble);

        debug!(
            connection_id = context.connection_id(),
            plugin = %plugin,
            "Requested auth method switch"
        );
        Ok(AuthOutcome::SwitchRequested)
    }

    fn auth_switch_response(
        &mut self,
        sink: &mut dyn PacketSink,
        payload: &[u8],
        backend: &mut BackendConnection,
    ) -> Result<AuthOutcome> {
        let response = parse_auth_switch_response(payload);
        self.phase.transition(ConnectionPhase::SwitchResponseReceived)?;

        self.auth_response = response.auth_plugin_response;
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.auth_response = self.auth_response.clone();
        }
        self.complete(sink, backend)
    }

    /// Resolve the requested schema and check credentials.
    fn complete(
        &mut self,
        sink: &mut dyn PacketSink,
        backend: &mut BackendConnection,
    ) -> Result<AuthOutcome> {
        let (Some(context), Some(attempt)) = (self.context.clone(), self.attempt.clone()) else {
            return Err(self.violation());
        };
        let connection_id = context.connection_id();

        let schema = match attempt.database.as_deref() {
            Some(database) => match self.schemas.resolve(database) {
                Some(schema) => Some(schema),
                None => {
                    info!(
                        connection_id,
                        user = %attempt.username,
                        database,
                        "Login rejected: unknown database"
                    );
                    let host = self.client_host.clone();
                    let args = [attempt.username.as_str(), host.as_str(), database];
                    return self.reject(sink, ServerErrorCode::DbAccessDenied, &args);
                }
            },
            None => None,
        };

        let request = LoginRequest {
            username: &attempt.username,
            host: &self.client_host,
            auth_response: &attempt.auth_response,
            database: attempt.database.as_deref(),
            scramble: context.scramble(),
        };

        match self.handler.login(&request) {
            Ok(()) => {
                self.phase.transition(ConnectionPhase::Authenticated)?;
                self.emitter.send_ok(sink);
                backend.set_connection_id(connection_id);
                backend.set_username(attempt.username.as_str());
                backend.set_current_schema(schema);
                info!(
                    connection_id,
                    user = %attempt.username,
                    database = attempt.database.as_deref().unwrap_or(""),
                    "Client authenticated"
                );
                Ok(AuthOutcome::Authenticated)
            }
            Err(code) => {
                info!(
                    connection_id,
                    user = %attempt.username,
                    code = code.code(),
                    "Login rejected"
                );
                let host = self.client_host.clone();
                let database = attempt.database.as_deref().unwrap_or("");
                let user = attempt.username.as_str();
                let args: Vec<&str> = match code {
                    ServerErrorCode::AccessDenied => {
                        vec![user, host.as_str(), attempt.using_password()]
                    }
                    ServerErrorCode::DbAccessDenied => vec![user, host.as_str(), database],
                    ServerErrorCode::BadDb => vec![database],
                    _ => Vec::new(),
                };
                self.reject(sink, code, &args)
            }
        }
    }

    fn reject(
        &mut self,
        sink: &mut dyn PacketSink,
        code: ServerErrorCode,
        args: &[&str],
    ) -> Result<AuthOutcome> {
        self.phase.transition(ConnectionPhase::Rejected)?;
        self.emitter.send_error(sink, code, args);
        Ok(AuthOutcome::Rejected(code))
    }
}
