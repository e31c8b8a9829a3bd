//! Connection-phase front-end.
//!
//! [`AuthenticationEngine`] owns one connection's handshake: it sends the
//! greeting, walks the [`ConnectionPhase`] table on every inbound packet and
//! writes each reply to a [`PacketSink`]. It never touches a socket; the
//! server module drains the sink onto the wire.

mod connection_id;
mod context;
mod emitter;
mod engine;
mod phase;

pub use connection_id::ConnectionIdGenerator;
pub use context::{AuthAttempt, HandshakeContext};
pub use emitter::{OutboundPacket, PacketSink, ResponseEmitter, ServerPacket};
pub use engine::{AuthOutcome, AuthenticationEngine};
pub use phase::ConnectionPhase;
