//! MySQL protocol implementation
//!
//! This module contains:
//! - Capability flags
//! - Payload primitives (integers, NUL/lenenc/EOF strings)
//! - Packet structures and server error codes
//! - Packet parser (read/write)
//! - Authentication (mysql_native_password)

pub mod auth;
pub mod capability;
pub mod error_code;
pub mod packets;
pub mod parser;
pub mod payload;

pub use auth::*;
pub use capability::CapabilityFlags;
pub use error_code::ServerErrorCode;
pub use packets::*;
pub use parser::*;
pub use payload::PacketPayload;
