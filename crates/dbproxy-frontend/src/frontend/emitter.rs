//! Server packet construction for the connection phase.

use crate::protocol::mysql::{
    build_auth_switch_request, build_err_packet, build_handshake_v10, build_ok_packet,
    AuthSwitchRequest, CapabilityFlags, ErrPacket, HandshakeV10, OkPacket, ServerErrorCode,
    DEFAULT_SERVER_VERSION, SCRAMBLE_LENGTH,
};

/// A packet the server sends during the connection phase.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    Handshake(Box<HandshakeV10>),
    Ok(OkPacket),
    Err(ErrPacket),
    AuthSwitchRequest(AuthSwitchRequest),
}

impl ServerPacket {
    /// Serialize the payload. OK and ERR layouts depend on whether the
    /// client speaks protocol 4.1.
    pub fn encode(&self, capabilities: CapabilityFlags) -> Vec<u8> {
        match self {
            ServerPacket::Handshake(handshake) => build_handshake_v10(handshake),
            ServerPacket::Ok(ok) => build_ok_packet(ok, capabilities),
            ServerPacket::Err(err) => build_err_packet(err, capabilities),
            ServerPacket::AuthSwitchRequest(request) => build_auth_switch_request(request),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ServerPacket::Ok(_))
    }

    /// Error code, if this is an ERR packet
    pub fn error_code(&self) -> Option<u16> {
        match self {
            ServerPacket::Err(err) => Some(err.error_code),
            _ => None,
        }
    }
}

/// A packet paired with the sequence id it goes out with.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPacket {
    pub sequence_id: u8,
    pub packet: ServerPacket,
}

/// Destination for outbound packets.
///
/// Writes are fire-and-forget from the engine's side; the transport that
/// drains the sink reports I/O failures.
pub trait PacketSink {
    fn write_and_flush(&mut self, packet: OutboundPacket);
}

impl PacketSink for Vec<OutboundPacket> {
    fn write_and_flush(&mut self, packet: OutboundPacket) {
        self.push(packet);
    }
}

/// Builds greeting, OK, ERR and auth-switch packets and tracks the
/// outbound sequence id.
///
/// The greeting goes out with sequence id 0. Every reply uses the inbound
/// sequence id plus one, set with [`ResponseEmitter::reply_to`].
#[derive(Debug, Clone)]
pub struct ResponseEmitter {
    server_version: String,
    next_sequence_id: u8,
}

impl Default for ResponseEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_VERSION)
    }
}

impl ResponseEmitter {
    pub fn new(server_version: impl Into<String>) -> Self {
        Self {
            server_version: server_version.into(),
            next_sequence_id: 0,
        }
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Sequence id the next packet will carry
    pub fn next_sequence_id(&self) -> u8 {
        self.next_sequence_id
    }

    /// Record an inbound packet's sequence id; the reply follows it.
    pub fn reply_to(&mut self, inbound_sequence_id: u8) {
        self.next_sequence_id = inbound_sequence_id.wrapping_add(1);
    }

    pub fn send_greeting(
        &mut self,
        sink: &mut dyn PacketSink,
        connection_id: u32,
        scramble: &[u8; SCRAMBLE_LENGTH],
        capabilities: CapabilityFlags,
    ) {
        let mut handshake = HandshakeV10::new(&self.server_version, connection_id, scramble);
        handshake.capability_flags = capabilities;
        self.next_sequence_id = 0;
        self.emit(sink, ServerPacket::Handshake(Box::new(handshake)));
    }

    pub fn send_ok(&mut self, sink: &mut dyn PacketSink) {
        self.emit(sink, ServerPacket::Ok(OkPacket::default()));
    }

    /// Send an ERR packet with `code`'s message, filled in from `args`.
    pub fn send_error(&mut self, sink: &mut dyn PacketSink, code: ServerErrorCode, args: &[&str]) {
        self.emit(sink, ServerPacket::Err(code.to_err_packet(args)));
    }

    /// Ask the client to re-authenticate with `plugin_name` against the
    /// connection's original scramble.
    pub fn send_auth_switch_request(
        &mut self,
        sink: &mut dyn PacketSink,
        plugin_name: &str,
        scramble: &[u8; SCRAMBLE_LENGTH],
    ) {
        self.emit(
            sink,
            ServerPacket::AuthSwitchRequest(AuthSwitchRequest::new(plugin_name, scramble)),
        );
    }

    fn emit(&mut self, sink: &mut dyn PacketSink, packet: ServerPacket) {
        let sequence_id = self.next_sequence_id;
        self.next_sequence_id = sequence_id.wrapping_add(1);
        sink.write_and_flush(OutboundPacket {
            sequence_id,
            packet,
        });
    }
}
