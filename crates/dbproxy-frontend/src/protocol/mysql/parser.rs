//! MySQL packet parser
//!
//! This module provides functions to read and write MySQL protocol packets.
//! Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_packets.html>

use super::capability::CapabilityFlags;
use super::packets::*;
use super::payload::{
    write_length_encoded_int, write_string_lenenc, write_string_nul, PacketPayload,
};
use crate::error::{ProxyError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// ============================================================================
// Packet Framing
// ============================================================================

/// Read a complete MySQL packet from a stream
///
/// Returns the packet header and payload bytes
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<(PacketHeader, Vec<u8>)> {
    // Read 4-byte header
    let mut header_buf = [0u8; 4];
    reader.read_exact(&mut header_buf).await?;

    // Parse header: 3 bytes length (little-endian) + 1 byte sequence ID
    let payload_length = u32::from_le_bytes([header_buf[0], header_buf[1], header_buf[2], 0]);
    let sequence_id = header_buf[3];

    let header = PacketHeader::new(payload_length, sequence_id);

    // Read payload
    let mut payload = vec![0u8; payload_length as usize];
    reader.read_exact(&mut payload).await?;

    Ok((header, payload))
}

/// Write a MySQL packet to a stream
pub async fn write_packet<W: AsyncWrite + Unpin>(
    writer: &mut W,
    sequence_id: u8,
    payload: &[u8],
) -> Result<()> {
    if payload.len() > PacketHeader::MAX_PAYLOAD_LENGTH as usize {
        return Err(ProxyError::Protocol(format!(
            "Payload of {} bytes exceeds a single packet",
            payload.len()
        )));
    }

    // Build header
    let len = payload.len() as u32;
    let header = [
        (len & 0xFF) as u8,
        ((len >> 8) & 0xFF) as u8,
        ((len >> 16) & 0xFF) as u8,
        sequence_id,
    ];

    // Write header and payload
    writer.write_all(&header).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;

    Ok(())
}

// ============================================================================
// Packet Parsing
// ============================================================================

/// Parse a HandshakeV10 packet from payload bytes
pub fn parse_handshake_v10(payload: &[u8]) -> Result<HandshakeV10> {
    let mut reader = PacketPayload::new(payload);

    let protocol_version = reader.read_int1()?;
    if protocol_version != 10 {
        return Err(ProxyError::Protocol(format!(
            "Unsupported protocol version: {}",
            protocol_version
        )));
    }

    let server_version = reader.read_string_nul()?;
    let connection_id = reader.read_int4()?;

    let mut auth_plugin_data_part_1 = [0u8; 8];
    auth_plugin_data_part_1.copy_from_slice(&reader.read_string_fix_by_bytes(8)?);

    // Filler (1 byte, always 0x00)
    reader.skip_reserved(1)?;

    let capability_flags_lower = reader.read_int2()?;
    let character_set = reader.read_int1()?;
    let status_flags = reader.read_int2()?;
    let capability_flags_upper = reader.read_int2()?;
    let capability_flags =
        CapabilityFlags::from_halves(capability_flags_lower, capability_flags_upper);
    let auth_plugin_data_length = reader.read_int1()?;
    reader.skip_reserved(10)?;

    let mut auth_plugin_data_part_2 = Vec::new();
    if capability_flags.has_secure_connection() {
        // Length is max(13, auth_plugin_data_length - 8)
        let part2_len = std::cmp::max(13, auth_plugin_data_length.saturating_sub(8) as usize);
        let actual_len = std::cmp::min(part2_len, reader.remaining());
        auth_plugin_data_part_2 = reader.read_string_fix_by_bytes(actual_len)?;
        // Remove trailing null if present
        if auth_plugin_data_part_2.last() == Some(&0) {
            auth_plugin_data_part_2.pop();
        }
    }

    let auth_plugin_name = if capability_flags.supports_plugin_auth() && reader.has_remaining() {
        reader.read_string_nul()?
    } else {
        String::new()
    };

    Ok(HandshakeV10 {
        protocol_version,
        server_version,
        connection_id,
        auth_plugin_data_part_1,
        capability_flags,
        character_set,
        status_flags,
        auth_plugin_data_length,
        auth_plugin_data_part_2,
        auth_plugin_name,
    })
}

/// Parse a HandshakeResponse41 packet from payload bytes
///
/// Connection attributes, if any, are ignored: the greeting never advertises
/// `CLIENT_CONNECT_ATTRS`.
pub fn parse_handshake_response41(payload: &[u8]) -> Result<HandshakeResponse41> {
    let mut reader = PacketPayload::new(payload);

    let capability_flags = CapabilityFlags::from_wire(reader.read_int4()?);
    if !capability_flags.is_protocol_41() {
        return Err(ProxyError::Protocol(
            "Client does not speak protocol 4.1".into(),
        ));
    }

    let max_packet_size = reader.read_int4()?;
    let character_set = reader.read_int1()?;
    reader.skip_reserved(23)?;

    // An SSL request stops right after the reserved bytes
    if capability_flags.requests_ssl() && !reader.has_remaining() {
        return Err(ProxyError::Protocol(
            "SSL upgrade requested but TLS is not offered".into(),
        ));
    }

    let username = reader.read_string_nul()?;

    let auth_response = if capability_flags.has_lenenc_auth_data() {
        reader.read_string_lenenc_by_bytes()?
    } else if capability_flags.has_secure_connection() {
        let len = reader.read_int1()? as usize;
        reader.read_string_fix_by_bytes(len)?
    } else {
        reader.read_string_nul_by_bytes()?
    };

    // An empty database name means "no database"
    let database = if capability_flags.connects_with_db() && reader.has_remaining() {
        Some(reader.read_string_nul()?).filter(|db| !db.is_empty())
    } else {
        None
    };

    let auth_plugin_name = if capability_flags.supports_plugin_auth() && reader.has_remaining() {
        Some(reader.read_string_nul()?)
    } else {
        None
    };

    Ok(HandshakeResponse41 {
        capability_flags,
        max_packet_size,
        character_set,
        username,
        auth_response,
        database,
        auth_plugin_name,
    })
}

/// Parse an Auth Switch Response: the whole payload is the auth data
pub fn parse_auth_switch_response(payload: &[u8]) -> AuthSwitchResponse {
    AuthSwitchResponse {
        auth_plugin_response: PacketPayload::new(payload).read_string_eof_by_bytes(),
    }
}

/// Parse an Auth Switch Request from payload bytes
pub fn parse_auth_switch_request(payload: &[u8]) -> Result<AuthSwitchRequest> {
    let mut reader = PacketPayload::new(payload);
    let header = reader.read_int1()?;
    if header != AUTH_SWITCH_REQUEST {
        return Err(ProxyError::Protocol(format!(
            "Invalid auth switch header: 0x{:02X}",
            header
        )));
    }
    let plugin_name = reader.read_string_nul()?;
    let mut plugin_data = reader.read_string_eof_by_bytes();
    if plugin_data.last() == Some(&0) {
        plugin_data.pop();
    }
    Ok(AuthSwitchRequest {
        header,
        plugin_name,
        plugin_data,
    })
}

/// Parse an OK packet from payload bytes
pub fn parse_ok_packet(payload: &[u8], capabilities: CapabilityFlags) -> Result<OkPacket> {
    let mut reader = PacketPayload::new(payload);

    let header = reader.read_int1()?;
    if header != OK_HEADER && header != 0xFE {
        return Err(ProxyError::Protocol(format!(
            "Invalid OK packet header: 0x{:02X}",
            header
        )));
    }

    let affected_rows = reader.read_int_lenenc()?;
    let last_insert_id = reader.read_int_lenenc()?;

    let (status_flags, warnings) = if capabilities.is_protocol_41() {
        (reader.read_int2()?, reader.read_int2()?)
    } else {
        (0, 0)
    };

    let info = reader.read_string_eof();

    Ok(OkPacket {
        header,
        affected_rows,
        last_insert_id,
        status_flags,
        warnings,
        info,
    })
}

/// Parse an ERR packet from payload bytes
pub fn parse_err_packet(payload: &[u8], capabilities: CapabilityFlags) -> Result<ErrPacket> {
    let mut reader = PacketPayload::new(payload);

    let header = reader.read_int1()?;
    if header != ERR_HEADER {
        return Err(ProxyError::Protocol(format!(
            "Invalid ERR packet header: 0x{:02X}",
            header
        )));
    }

    let error_code = reader.read_int2()?;

    let (sql_state_marker, sql_state) = if capabilities.is_protocol_41() {
        let marker = reader.read_int1()? as char;
        let mut state = [0u8; 5];
        state.copy_from_slice(&reader.read_string_fix_by_bytes(5)?);
        (marker, state)
    } else {
        ('#', *b"HY000")
    };

    let error_message = reader.read_string_eof();

    Ok(ErrPacket {
        header,
        error_code,
        sql_state_marker,
        sql_state,
        error_message,
    })
}

// ============================================================================
// Packet Building
// ============================================================================

/// Build a HandshakeV10 packet payload
pub fn build_handshake_v10(handshake: &HandshakeV10) -> Vec<u8> {
    let mut payload = Vec::with_capacity(128);

    payload.push(handshake.protocol_version);
    write_string_nul(&mut payload, handshake.server_version.as_bytes());
    payload.extend_from_slice(&handshake.connection_id.to_le_bytes());
    payload.extend_from_slice(&handshake.auth_plugin_data_part_1);

    // Filler
    payload.push(0);

    payload.extend_from_slice(&handshake.capability_flags.lower().to_le_bytes());
    payload.push(handshake.character_set);
    payload.extend_from_slice(&handshake.status_flags.to_le_bytes());
    payload.extend_from_slice(&handshake.capability_flags.upper().to_le_bytes());
    payload.push(handshake.auth_plugin_data_length);

    // Reserved
    payload.extend_from_slice(&[0u8; 10]);

    write_string_nul(&mut payload, &handshake.auth_plugin_data_part_2);
    write_string_nul(&mut payload, handshake.auth_plugin_name.as_bytes());

    payload
}

/// Build a HandshakeResponse41 packet payload
pub fn build_handshake_response41(response: &HandshakeResponse41) -> Vec<u8> {
    let mut payload = Vec::with_capacity(128);
    let flags = response.capability_flags;

    payload.extend_from_slice(&flags.bits().to_le_bytes());
    payload.extend_from_slice(&response.max_packet_size.to_le_bytes());
    payload.push(response.character_set);
    payload.extend_from_slice(&[0u8; 23]);
    write_string_nul(&mut payload, response.username.as_bytes());

    if flags.has_lenenc_auth_data() {
        write_string_lenenc(&mut payload, &response.auth_response);
    } else if flags.has_secure_connection() {
        payload.push(response.auth_response.len() as u8);
        payload.extend_from_slice(&response.auth_response);
    } else {
        write_string_nul(&mut payload, &response.auth_response);
    }

    if flags.connects_with_db() {
        let db = response.database.as_deref().unwrap_or("");
        write_string_nul(&mut payload, db.as_bytes());
    }

    if let Some(ref name) = response.auth_plugin_name {
        if flags.supports_plugin_auth() {
            write_string_nul(&mut payload, name.as_bytes());
        }
    }

    payload
}

/// Build an OK packet payload
pub fn build_ok_packet(ok: &OkPacket, capabilities: CapabilityFlags) -> Vec<u8> {
    let mut payload = Vec::with_capacity(32);

    payload.push(ok.header);
    write_length_encoded_int(&mut payload, ok.affected_rows);
    write_length_encoded_int(&mut payload, ok.last_insert_id);

    if capabilities.is_protocol_41() {
        payload.extend_from_slice(&ok.status_flags.to_le_bytes());
        payload.extend_from_slice(&ok.warnings.to_le_bytes());
    }

    if !ok.info.is_empty() {
        payload.extend_from_slice(ok.info.as_bytes());
    }

    payload
}

/// Build an ERR packet payload
pub fn build_err_packet(err: &ErrPacket, capabilities: CapabilityFlags) -> Vec<u8> {
    let mut payload = Vec::with_capacity(64);

    payload.push(err.header);
    payload.extend_from_slice(&err.error_code.to_le_bytes());

    if capabilities.is_protocol_41() {
        payload.push(err.sql_state_marker as u8);
        payload.extend_from_slice(&err.sql_state);
    }

    payload.extend_from_slice(err.error_message.as_bytes());

    payload
}

/// Build an Auth Switch Request payload
pub fn build_auth_switch_request(request: &AuthSwitchRequest) -> Vec<u8> {
    let mut payload = Vec::with_capacity(48);
    payload.push(request.header);
    write_string_nul(&mut payload, request.plugin_name.as_bytes());
    write_string_nul(&mut payload, &request.plugin_data);
    payload
}
