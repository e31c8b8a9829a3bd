//! Server module for dbproxy-frontend
//!
//! This module contains:
//! - TCP listener
//! - Per-connection driver (handshake, then command phase)
//! - Command-phase responder

pub mod command;
pub mod connection;
pub mod listener;

pub use command::{CommandAction, CommandResponder};
pub use connection::Connection;
pub use listener::{Listener, ListenerStats};
