//! MySQL packet structures
//!
//! This module defines the wire protocol structures exchanged during the
//! connection phase and the generic OK/ERR responses.
//! Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_packets.html>

use super::capability::CapabilityFlags;

/// Length of the scramble (auth plugin data) sent in the greeting
pub const SCRAMBLE_LENGTH: usize = 20;

/// Name of the only authentication plugin the front-end verifies
pub const MYSQL_NATIVE_PASSWORD: &str = "mysql_native_password";

/// Default character set: utf8_general_ci
pub const DEFAULT_CHARACTER_SET: u8 = 0x21;

/// Default server version string announced in the greeting
pub const DEFAULT_SERVER_VERSION: &str = "5.7.40-dbproxy";

/// MySQL packet header (4 bytes)
#[derive(Debug, Clone)]
pub struct PacketHeader {
    /// Payload length (3 bytes, max 16MB - 1)
    pub payload_length: u32,
    /// Sequence ID (1 byte)
    pub sequence_id: u8,
}

impl PacketHeader {
    /// Maximum payload size (2^24 - 1)
    pub const MAX_PAYLOAD_LENGTH: u32 = 0xFF_FF_FF;

    /// Create a new packet header
    pub fn new(payload_length: u32, sequence_id: u8) -> Self {
        Self {
            payload_length,
            sequence_id,
        }
    }
}

/// MySQL Handshake V10 packet (server -> client), a.k.a. the greeting
/// Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets_protocol_handshake_v10.html>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeV10 {
    /// Protocol version (always 10)
    pub protocol_version: u8,
    /// Server version string (null-terminated)
    pub server_version: String,
    /// Connection ID
    pub connection_id: u32,
    /// First 8 bytes of auth plugin data (scramble)
    pub auth_plugin_data_part_1: [u8; 8],
    /// Capability flags (both halves)
    pub capability_flags: CapabilityFlags,
    /// Character set
    pub character_set: u8,
    /// Status flags
    pub status_flags: u16,
    /// Length of auth plugin data (if CLIENT_PLUGIN_AUTH)
    pub auth_plugin_data_length: u8,
    /// Rest of auth plugin data (12 bytes, NUL appended on the wire)
    pub auth_plugin_data_part_2: Vec<u8>,
    /// Auth plugin name (if CLIENT_PLUGIN_AUTH)
    pub auth_plugin_name: String,
}

impl Default for HandshakeV10 {
    fn default() -> Self {
        Self {
            protocol_version: 10,
            server_version: DEFAULT_SERVER_VERSION.to_string(),
            connection_id: 1,
            auth_plugin_data_part_1: [0u8; 8],
            capability_flags: CapabilityFlags::server_default(),
            character_set: DEFAULT_CHARACTER_SET,
            status_flags: SERVER_STATUS_AUTOCOMMIT,
            auth_plugin_data_length: (SCRAMBLE_LENGTH + 1) as u8,
            auth_plugin_data_part_2: vec![0u8; 12],
            auth_plugin_name: MYSQL_NATIVE_PASSWORD.to_string(),
        }
    }
}

impl HandshakeV10 {
    /// Build a greeting carrying the given connection id and scramble
    pub fn new(server_version: &str, connection_id: u32, scramble: &[u8; SCRAMBLE_LENGTH]) -> Self {
        let mut auth_plugin_data_part_1 = [0u8; 8];
        auth_plugin_data_part_1.copy_from_slice(&scramble[..8]);
        Self {
            server_version: server_version.to_string(),
            connection_id,
            auth_plugin_data_part_1,
            auth_plugin_data_part_2: scramble[8..].to_vec(),
            ..Self::default()
        }
    }

    /// Get the full 20-byte scramble (auth_plugin_data_part_1 + auth_plugin_data_part_2)
    pub fn get_scramble(&self) -> Vec<u8> {
        let mut scramble = Vec::with_capacity(SCRAMBLE_LENGTH);
        scramble.extend_from_slice(&self.auth_plugin_data_part_1);
        // Take first 12 bytes of part 2 to make 20 total
        let part2_len = std::cmp::min(12, self.auth_plugin_data_part_2.len());
        scramble.extend_from_slice(&self.auth_plugin_data_part_2[..part2_len]);
        scramble
    }
}

/// MySQL Handshake Response 41 packet (client -> server)
/// Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets_protocol_handshake_response.html>
#[derive(Debug, Clone)]
pub struct HandshakeResponse41 {
    /// Capability flags (4 bytes)
    pub capability_flags: CapabilityFlags,
    /// Max packet size
    pub max_packet_size: u32,
    /// Character set
    pub character_set: u8,
    /// Username (null-terminated)
    pub username: String,
    /// Scrambled password
    pub auth_response: Vec<u8>,
    /// Database name (if CLIENT_CONNECT_WITH_DB)
    pub database: Option<String>,
    /// Auth plugin name (if CLIENT_PLUGIN_AUTH)
    pub auth_plugin_name: Option<String>,
}

impl Default for HandshakeResponse41 {
    fn default() -> Self {
        Self {
            capability_flags: CapabilityFlags::empty(),
            max_packet_size: 0x00FF_FFFF,
            character_set: DEFAULT_CHARACTER_SET,
            username: String::new(),
            auth_response: Vec::new(),
            database: None,
            auth_plugin_name: None,
        }
    }
}

/// MySQL OK Packet (server -> client)
/// Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_ok_packet.html>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkPacket {
    /// Header (0x00 or 0xFE)
    pub header: u8,
    /// Affected rows (length-encoded int)
    pub affected_rows: u64,
    /// Last insert ID (length-encoded int)
    pub last_insert_id: u64,
    /// Status flags (if CLIENT_PROTOCOL_41)
    pub status_flags: u16,
    /// Warnings (if CLIENT_PROTOCOL_41)
    pub warnings: u16,
    /// Human readable info
    pub info: String,
}

impl Default for OkPacket {
    fn default() -> Self {
        Self {
            header: 0x00,
            affected_rows: 0,
            last_insert_id: 0,
            status_flags: SERVER_STATUS_AUTOCOMMIT,
            warnings: 0,
            info: String::new(),
        }
    }
}

/// MySQL ERR Packet (server -> client)
/// Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_err_packet.html>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrPacket {
    /// Header (0xFF)
    pub header: u8,
    /// Error code
    pub error_code: u16,
    /// SQL state marker (if CLIENT_PROTOCOL_41)
    pub sql_state_marker: char,
    /// SQL state (5 characters, if CLIENT_PROTOCOL_41)
    pub sql_state: [u8; 5],
    /// Error message
    pub error_message: String,
}

impl Default for ErrPacket {
    fn default() -> Self {
        Self {
            header: 0xFF,
            error_code: 0,
            sql_state_marker: '#',
            sql_state: *b"HY000",
            error_message: String::new(),
        }
    }
}

impl ErrPacket {
    /// Create a new error packet with the given code and message
    pub fn new(error_code: u16, error_message: impl Into<String>) -> Self {
        Self {
            error_code,
            error_message: error_message.into(),
            ..Self::default()
        }
    }
}

/// Auth Switch Request (server -> client)
/// Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets_protocol_auth_switch_request.html>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSwitchRequest {
    /// Status marker (0xFE)
    pub header: u8,
    /// Plugin the client must switch to
    pub plugin_name: String,
    /// Plugin data: the connection's original scramble
    pub plugin_data: Vec<u8>,
}

impl AuthSwitchRequest {
    /// Create a switch request for `plugin_name` carrying `scramble`
    pub fn new(plugin_name: impl Into<String>, scramble: &[u8]) -> Self {
        Self {
            header: AUTH_SWITCH_REQUEST,
            plugin_name: plugin_name.into(),
            plugin_data: scramble.to_vec(),
        }
    }
}

/// Auth Switch Response (client -> server): the raw scrambled password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSwitchResponse {
    /// Auth data computed with the requested plugin
    pub auth_plugin_response: Vec<u8>,
}

// ============================================================================
// Packet markers
// ============================================================================

/// OK packet header
pub const OK_HEADER: u8 = 0x00;

/// Auth switch request indicator (0xFE)
pub const AUTH_SWITCH_REQUEST: u8 = 0xFE;

/// ERR packet header
pub const ERR_HEADER: u8 = 0xFF;

// ============================================================================
// Status Flags
// ============================================================================

/// Server status: in transaction
pub const SERVER_STATUS_IN_TRANS: u16 = 0x0001;

/// Server status: auto-commit enabled
pub const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;

// ============================================================================
// MySQL Command Types
// Reference: https://dev.mysql.com/doc/dev/mysql-server/latest/my__command_8h.html
// ============================================================================

/// Quit connection (COM_QUIT)
pub const COM_QUIT: u8 = 0x01;

/// Switch database (COM_INIT_DB)
pub const COM_INIT_DB: u8 = 0x02;

/// Execute SQL query (COM_QUERY)
pub const COM_QUERY: u8 = 0x03;

/// Ping server (COM_PING)
pub const COM_PING: u8 = 0x0e;
