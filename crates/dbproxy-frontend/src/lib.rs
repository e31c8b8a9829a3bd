//! dbproxy-frontend - MySQL-compatible client front-end for a database proxy
//!
//! This library terminates client connections speaking the MySQL wire
//! protocol and authenticates them before any SQL is processed:
//! - Sends the HandshakeV10 greeting with a fresh 20-byte scramble
//! - Verifies `mysql_native_password` responses, switching clients that
//!   negotiate another plugin via an auth switch request
//! - Resolves the requested logical schema against a hot-reloadable registry
//! - Answers the minimal command set of an authenticated idle session
//!
//! The [`frontend::AuthenticationEngine`] is transport-agnostic; the
//! [`server`] module drives it over TCP.

#[macro_use]
mod logging;

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod frontend;
pub mod protocol;
pub mod schema;
pub mod server;

pub use auth::{
    AuthenticationHandler, LoginRequest, NativePasswordAuthenticationHandler, ProxyUser,
    UserRegistry,
};
pub use backend::BackendConnection;
pub use config::Config;
pub use error::{ProxyError, Result};
pub use frontend::{AuthOutcome, AuthenticationEngine, ConnectionPhase};
pub use protocol::mysql::ServerErrorCode;
pub use schema::{SchemaDescriptor, SchemaRegistry, SchemaResolver, SchemaSnapshot};
pub use server::{Listener, ListenerStats};
