//! Wire protocol support for dbproxy-frontend
//!
//! This module contains:
//! - MySQL packet codec (framing, primitives, connection-phase packets)
//! - MySQL `mysql_native_password` scramble and verification

pub mod mysql;
