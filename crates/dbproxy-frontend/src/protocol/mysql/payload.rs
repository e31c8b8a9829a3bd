//! Primitive readers and writers for MySQL packet payloads.
//!
//! Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_dt_integers.html>
//! and <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_dt_strings.html>

use crate::error::{ProxyError, Result};

/// Cursor over a single packet payload (header already stripped).
///
/// Every read is bounds-checked and reports truncation as
/// [`ProxyError::Protocol`] instead of panicking.
#[derive(Debug, Clone)]
pub struct PacketPayload<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> PacketPayload<'a> {
    /// Wrap a payload
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Whether any bytes are left
    pub fn has_remaining(&self) -> bool {
        self.cursor < self.data.len()
    }

    /// Current read offset
    pub fn position(&self) -> usize {
        self.cursor
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(ProxyError::Protocol(format!(
                "Not enough bytes for {}: need {}, have {}",
                what,
                len,
                self.remaining()
            )));
        }
        let slice = &self.data[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    /// Read a 1-byte integer
    pub fn read_int1(&mut self) -> Result<u8> {
        Ok(self.take(1, "int<1>")?[0])
    }

    /// Read a little-endian 2-byte integer
    pub fn read_int2(&mut self) -> Result<u16> {
        let b = self.take(2, "int<2>")?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian 3-byte integer
    pub fn read_int3(&mut self) -> Result<u32> {
        let b = self.take(3, "int<3>")?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    /// Read a little-endian 4-byte integer
    pub fn read_int4(&mut self) -> Result<u32> {
        let b = self.take(4, "int<4>")?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian 8-byte integer
    pub fn read_int8(&mut self) -> Result<u64> {
        let b = self.take(8, "int<8>")?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a length-encoded integer
    pub fn read_int_lenenc(&mut self) -> Result<u64> {
        match self.read_int1()? {
            // NULL (only in row data)
            0xFB => Ok(0),
            0xFC => Ok(self.read_int2()? as u64),
            0xFD => Ok(self.read_int3()? as u64),
            0xFE => self.read_int8(),
            // 0xFF is reserved for ERR packet header
            0xFF => Err(ProxyError::Protocol(
                "Invalid length-encoded int marker 0xFF".into(),
            )),
            n => Ok(n as u64),
        }
    }

    /// Skip `len` reserved/filler bytes
    pub fn skip_reserved(&mut self, len: usize) -> Result<()> {
        self.take(len, "reserved bytes").map(|_| ())
    }

    /// Read exactly `len` bytes
    pub fn read_string_fix_by_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.take(len, "fixed-length string")?.to_vec())
    }

    /// Read a length-encoded byte string
    pub fn read_string_lenenc_by_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_int_lenenc()?;
        let len = usize::try_from(len)
            .map_err(|_| ProxyError::Protocol(format!("Length {} out of range", len)))?;
        self.read_string_fix_by_bytes(len)
    }

    /// Read a null-terminated byte string (terminator consumed, not returned)
    pub fn read_string_nul_by_bytes(&mut self) -> Result<Vec<u8>> {
        let rest = &self.data[self.cursor..];
        let null_pos = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| ProxyError::Protocol("Missing null terminator".into()))?;
        let bytes = rest[..null_pos].to_vec();
        self.cursor += null_pos + 1;
        Ok(bytes)
    }

    /// Read a null-terminated string, replacing invalid UTF-8
    pub fn read_string_nul(&mut self) -> Result<String> {
        let bytes = self.read_string_nul_by_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read everything up to the end of the payload
    pub fn read_string_eof_by_bytes(&mut self) -> Vec<u8> {
        let bytes = self.data[self.cursor..].to_vec();
        self.cursor = self.data.len();
        bytes
    }

    /// Read the rest of the payload as a string, replacing invalid UTF-8
    pub fn read_string_eof(&mut self) -> String {
        String::from_utf8_lossy(&self.read_string_eof_by_bytes()).into_owned()
    }
}

/// Write a length-encoded integer
pub fn write_length_encoded_int(buf: &mut Vec<u8>, value: u64) {
    if value < 251 {
        buf.push(value as u8);
    } else if value < 65536 {
        buf.push(0xFC);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value < 16_777_216 {
        buf.push(0xFD);
        buf.extend_from_slice(&(value as u32).to_le_bytes()[..3]);
    } else {
        buf.push(0xFE);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Write a null-terminated byte string
pub fn write_string_nul(buf: &mut Vec<u8>, value: &[u8]) {
    buf.extend_from_slice(value);
    buf.push(0);
}

/// Write a length-encoded byte string
pub fn write_string_lenenc(buf: &mut Vec<u8>, value: &[u8]) {
    write_length_encoded_int(buf, value.len() as u64);
    buf.extend_from_slice(value);
}
