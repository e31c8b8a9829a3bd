//! MySQL capability flags
//!
//! Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/group__group__cs__capabilities__flags.html>

bitflags::bitflags! {
    /// Capability flags negotiated between client and server.
    ///
    /// The server advertises its set in the greeting; the client answers with
    /// the subset it wants in HandshakeResponse41.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapabilityFlags: u32 {
        /// Client can handle long passwords
        const CLIENT_LONG_PASSWORD = 0x0000_0001;
        /// Found instead of affected rows
        const CLIENT_FOUND_ROWS = 0x0000_0002;
        /// Get all column flags
        const CLIENT_LONG_FLAG = 0x0000_0004;
        /// Can specify db on connect
        const CLIENT_CONNECT_WITH_DB = 0x0000_0008;
        /// Don't allow database.table.column
        const CLIENT_NO_SCHEMA = 0x0000_0010;
        /// Can use compression protocol
        const CLIENT_COMPRESS = 0x0000_0020;
        /// ODBC client
        const CLIENT_ODBC = 0x0000_0040;
        /// Can use LOAD DATA LOCAL
        const CLIENT_LOCAL_FILES = 0x0000_0080;
        /// Ignore spaces before '('
        const CLIENT_IGNORE_SPACE = 0x0000_0100;
        /// New 4.1 protocol
        const CLIENT_PROTOCOL_41 = 0x0000_0200;
        /// This is an interactive client
        const CLIENT_INTERACTIVE = 0x0000_0400;
        /// Switch to SSL after handshake
        const CLIENT_SSL = 0x0000_0800;
        /// Ignore sigpipes
        const CLIENT_IGNORE_SIGPIPE = 0x0000_1000;
        /// Client knows about transactions
        const CLIENT_TRANSACTIONS = 0x0000_2000;
        /// Old flag for 4.1 protocol (deprecated)
        const CLIENT_RESERVED = 0x0000_4000;
        /// 4.1 authentication, a.k.a. CLIENT_SECURE_CONNECTION
        const CLIENT_SECURE_CONNECTION = 0x0000_8000;
        /// Enable/disable multi-stmt support
        const CLIENT_MULTI_STATEMENTS = 0x0001_0000;
        /// Enable/disable multi-results
        const CLIENT_MULTI_RESULTS = 0x0002_0000;
        /// Multi-results in PS-protocol
        const CLIENT_PS_MULTI_RESULTS = 0x0004_0000;
        /// Client supports plugin authentication
        const CLIENT_PLUGIN_AUTH = 0x0008_0000;
        /// Client supports connection attributes
        const CLIENT_CONNECT_ATTRS = 0x0010_0000;
        /// Length of auth response can be > 255
        const CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA = 0x0020_0000;
        /// Don't close connection for user account with expired password
        const CLIENT_CAN_HANDLE_EXPIRED_PASSWORDS = 0x0040_0000;
        /// Capable of handling server state change info
        const CLIENT_SESSION_TRACK = 0x0080_0000;
        /// Client no longer needs EOF packet
        const CLIENT_DEPRECATE_EOF = 0x0100_0000;
    }
}

impl CapabilityFlags {
    /// Capabilities the front-end advertises in its greeting.
    ///
    /// Never includes `CLIENT_SSL` or `CLIENT_COMPRESS`.
    pub const fn server_default() -> Self {
        Self::CLIENT_LONG_PASSWORD
            .union(Self::CLIENT_FOUND_ROWS)
            .union(Self::CLIENT_LONG_FLAG)
            .union(Self::CLIENT_CONNECT_WITH_DB)
            .union(Self::CLIENT_PROTOCOL_41)
            .union(Self::CLIENT_TRANSACTIONS)
            .union(Self::CLIENT_SECURE_CONNECTION)
            .union(Self::CLIENT_MULTI_STATEMENTS)
            .union(Self::CLIENT_MULTI_RESULTS)
            .union(Self::CLIENT_PS_MULTI_RESULTS)
            .union(Self::CLIENT_PLUGIN_AUTH)
            .union(Self::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA)
    }

    /// Build from the raw 32-bit value on the wire, keeping unknown bits.
    pub const fn from_wire(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Rebuild from the two 16-bit halves carried by the greeting.
    pub const fn from_halves(lower: u16, upper: u16) -> Self {
        Self::from_bits_retain((upper as u32) << 16 | lower as u32)
    }

    /// Lower 2 bytes, as written in the greeting.
    pub const fn lower(self) -> u16 {
        (self.bits() & 0xFFFF) as u16
    }

    /// Upper 2 bytes, as written in the greeting.
    pub const fn upper(self) -> u16 {
        (self.bits() >> 16) as u16
    }

    /// Client can take part in plugin-based authentication and auth switches.
    pub const fn supports_plugin_auth(self) -> bool {
        self.contains(Self::CLIENT_PLUGIN_AUTH)
    }

    /// Client sends a database name in its handshake response.
    pub const fn connects_with_db(self) -> bool {
        self.contains(Self::CLIENT_CONNECT_WITH_DB)
    }

    /// Client speaks the 4.1 protocol (SQL state in ERR, status in OK).
    pub const fn is_protocol_41(self) -> bool {
        self.contains(Self::CLIENT_PROTOCOL_41)
    }

    /// Auth response is prefixed by a 1-byte length.
    pub const fn has_secure_connection(self) -> bool {
        self.contains(Self::CLIENT_SECURE_CONNECTION)
    }

    /// Auth response is prefixed by a length-encoded integer.
    pub const fn has_lenenc_auth_data(self) -> bool {
        self.contains(Self::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA)
    }

    /// Client asks to upgrade the connection to TLS.
    pub const fn requests_ssl(self) -> bool {
        self.contains(Self::CLIENT_SSL)
    }
}
