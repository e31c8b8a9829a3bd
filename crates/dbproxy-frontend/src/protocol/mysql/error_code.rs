//! Server error codes surfaced to clients in ERR packets.
//!
//! Reference: <https://dev.mysql.com/doc/mysql-errors/8.0/en/server-error-reference.html>

use std::fmt;

use super::packets::ErrPacket;

/// Closed set of protocol-level errors the front-end reports.
///
/// Each code carries its numeric value, SQL state and a message template
/// whose `%s` placeholders are filled positionally by [`ServerErrorCode::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerErrorCode {
    /// ER_DBACCESS_DENIED_ERROR
    DbAccessDenied,
    /// ER_ACCESS_DENIED_ERROR
    AccessDenied,
    /// ER_HANDSHAKE_ERROR
    HandshakeError,
    /// ER_UNKNOWN_COM_ERROR
    UnknownCommand,
    /// ER_BAD_DB_ERROR
    BadDb,
    /// ER_NOT_SUPPORTED_AUTH_MODE
    NotSupportedAuthMode,
}

impl ServerErrorCode {
    /// Numeric error code
    pub const fn code(self) -> u16 {
        match self {
            ServerErrorCode::HandshakeError => 1043,
            ServerErrorCode::DbAccessDenied => 1044,
            ServerErrorCode::AccessDenied => 1045,
            ServerErrorCode::UnknownCommand => 1047,
            ServerErrorCode::BadDb => 1049,
            ServerErrorCode::NotSupportedAuthMode => 1251,
        }
    }

    /// Five-character SQL state
    pub const fn sql_state(self) -> &'static [u8; 5] {
        match self {
            ServerErrorCode::AccessDenied => b"28000",
            ServerErrorCode::DbAccessDenied | ServerErrorCode::BadDb => b"42000",
            ServerErrorCode::HandshakeError | ServerErrorCode::UnknownCommand => b"08S01",
            ServerErrorCode::NotSupportedAuthMode => b"08004",
        }
    }

    /// Message template with `%s` placeholders
    pub const fn template(self) -> &'static str {
        match self {
            ServerErrorCode::DbAccessDenied => {
                "Access denied for user '%s'@'%s' to database '%s'"
            }
            ServerErrorCode::AccessDenied => {
                "Access denied for user '%s'@'%s' (using password: %s)"
            }
            ServerErrorCode::HandshakeError => "Bad handshake",
            ServerErrorCode::UnknownCommand => "Unknown command",
            ServerErrorCode::BadDb => "Unknown database '%s'",
            ServerErrorCode::NotSupportedAuthMode => {
                "Client does not support authentication protocol requested by server; consider upgrading MySQL client"
            }
        }
    }

    /// Format the message, substituting `args` for `%s` in order.
    ///
    /// Missing arguments leave an empty string in place of the placeholder;
    /// surplus arguments are ignored.
    pub fn message(self, args: &[&str]) -> String {
        let template = self.template();
        let mut out = String::with_capacity(template.len() + 32);
        let mut args = args.iter();
        let mut parts = template.split("%s");
        if let Some(first) = parts.next() {
            out.push_str(first);
        }
        for part in parts {
            out.push_str(args.next().copied().unwrap_or(""));
            out.push_str(part);
        }
        out
    }

    /// Build the ERR packet for this code.
    pub fn to_err_packet(self, args: &[&str]) -> ErrPacket {
        ErrPacket {
            error_code: self.code(),
            sql_state: *self.sql_state(),
            error_message: self.message(args),
            ..ErrPacket::default()
        }
    }
}

impl fmt::Display for ServerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.code(),
            String::from_utf8_lossy(self.sql_state())
        )
    }
}
