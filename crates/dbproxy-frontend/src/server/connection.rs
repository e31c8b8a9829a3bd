//! Connection driver for front-end client connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tracing::{span, Instrument, Level};

use super::command::{CommandAction, CommandResponder};
use crate::auth::AuthenticationHandler;
use crate::backend::BackendConnection;
use crate::error::{ProxyError, Result};
use crate::frontend::{AuthOutcome, AuthenticationEngine, OutboundPacket, ResponseEmitter};
use crate::protocol::mysql::{
    read_packet, write_packet, CapabilityFlags, ServerErrorCode, DEFAULT_SERVER_VERSION,
};
use crate::schema::SchemaResolver;

/// A front-end client connection.
///
/// Generic over the stream so tests can drive it over an in-memory duplex.
pub struct Connection<S> {
    stream: S,
    client_addr: SocketAddr,
    handler: Arc<dyn AuthenticationHandler>,
    schemas: Arc<dyn SchemaResolver>,
    server_version: String,
    handshake_timeout: Option<Duration>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        client_addr: SocketAddr,
        handler: Arc<dyn AuthenticationHandler>,
        schemas: Arc<dyn SchemaResolver>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            stream,
            client_addr,
            handler,
            schemas,
            server_version: DEFAULT_SERVER_VERSION.to_string(),
            handshake_timeout: None,
            shutdown_rx,
        }
    }

    /// Server version announced in the greeting
    pub fn with_server_version(mut self, server_version: impl Into<String>) -> Self {
        self.server_version = server_version.into();
        self
    }

    /// Deadline for the whole handshake. A zero duration disables it.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Handle the connection until the client leaves, authentication fails
    /// or shutdown is signalled.
    pub async fn handle(mut self) -> Result<()> {
        let span = span!(
            target: "dbproxy_frontend",
            Level::INFO,
            "connection",
            client = %self.client_addr
        );
        async move {
            debug!("New connection");
            let result = self.run().await;
            debug!("Connection closed");
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&mut self) -> Result<()> {
        let mut backend = BackendConnection::new();
        let host = self.client_addr.ip().to_string();
        let mut engine =
            AuthenticationEngine::new(Arc::clone(&self.handler), Arc::clone(&self.schemas))
                .with_server_version(self.server_version.clone())
                .with_client_host(host.clone());

        let outcome = match self.handshake_timeout {
            Some(limit) => {
                tokio::time::timeout(limit, self.authenticate(&mut engine, &mut backend))
                    .await
                    .map_err(|_| {
                        warn!(timeout_secs = limit.as_secs(), "Handshake timed out");
                        ProxyError::Timeout(format!("Handshake not completed within {:?}", limit))
                    })??
            }
            None => self.authenticate(&mut engine, &mut backend).await?,
        };

        if outcome != AuthOutcome::Authenticated {
            return Ok(());
        }

        let capabilities = engine.capabilities();
        let mut responder = CommandResponder::new(
            Arc::clone(&self.handler),
            Arc::clone(&self.schemas),
            host,
        );
        self.serve_commands(&mut responder, &mut backend, capabilities).await
    }

    /// Drive the engine until it reaches a terminal phase.
    async fn authenticate(
        &mut self,
        engine: &mut AuthenticationEngine,
        backend: &mut BackendConnection,
    ) -> Result<AuthOutcome> {
        let mut outbound: Vec<OutboundPacket> = Vec::new();
        engine.handshake(&mut outbound, backend)?;
        flush(&mut self.stream, &mut outbound, engine.capabilities()).await?;

        loop {
            let (header, payload) = read_packet(&mut self.stream).await?;
            let outcome = process_auth_packet(
                &mut self.stream,
                engine,
                header.sequence_id,
                &payload,
                backend,
            )
            .await?;
            if outcome.is_terminal() {
                return Ok(outcome);
            }
        }
    }

    async fn serve_commands(
        &mut self,
        responder: &mut CommandResponder,
        backend: &mut BackendConnection,
        capabilities: CapabilityFlags,
    ) -> Result<()> {
        let mut outbound: Vec<OutboundPacket> = Vec::new();
        loop {
            tokio::select! {
                result = read_packet(&mut self.stream) => {
                    let (header, payload) = match result {
                        Ok(packet) => packet,
                        Err(ProxyError::Io(e))
                            if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                        {
                            debug!("Client disconnected");
                            return Ok(());
                        }
                        Err(e) => return Err(e),
                    };
                    let action =
                        responder.respond(&mut outbound, header.sequence_id, &payload, backend);
                    flush(&mut self.stream, &mut outbound, capabilities).await?;
                    if action == CommandAction::Close {
                        return Ok(());
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    debug!("Shutdown signal received, closing connection");
                    return Ok(());
                }
            }
        }
    }
}

/// Feed one connection-phase packet to the engine and write its reply.
///
/// A packet the current phase does not accept is answered with
/// `ER_HANDSHAKE_ERROR` and the violation is returned; the caller closes the
/// connection.
async fn process_auth_packet<W: AsyncWrite + Unpin>(
    writer: &mut W,
    engine: &mut AuthenticationEngine,
    sequence_id: u8,
    payload: &[u8],
    backend: &mut BackendConnection,
) -> Result<AuthOutcome> {
    trace!(
        sequence_id,
        length = payload.len(),
        phase = %engine.phase(),
        "Received auth packet"
    );
    let mut outbound: Vec<OutboundPacket> = Vec::new();
    match engine.auth(&mut outbound, sequence_id, payload, backend) {
        Ok(outcome) => {
            flush(writer, &mut outbound, engine.capabilities()).await?;
            Ok(outcome)
        }
        Err(e) if e.is_protocol_violation() => {
            let mut emitter = ResponseEmitter::default();
            emitter.reply_to(sequence_id);
            emitter.send_error(&mut outbound, ServerErrorCode::HandshakeError, &[]);
            flush(writer, &mut outbound, engine.capabilities()).await?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Write every buffered packet to the stream.
async fn flush<W: AsyncWrite + Unpin>(
    writer: &mut W,
    outbound: &mut Vec<OutboundPacket>,
    capabilities: CapabilityFlags,
) -> Result<()> {
    for packet in outbound.drain(..) {
        let payload = packet.packet.encode(capabilities);
        trace!(
            sequence_id = packet.sequence_id,
            length = payload.len(),
            "Sending packet"
        );
        write_packet(writer, packet.sequence_id, &payload).await?;
    }
    Ok(())
}
