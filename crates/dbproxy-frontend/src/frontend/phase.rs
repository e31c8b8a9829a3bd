//! Authentication phase state machine.

use std::fmt;

use crate::error::{ProxyError, Result};

/// Where a connection is in the authentication handshake.
///
/// Legal transitions:
///
/// | From | To |
/// |---|---|
/// | `Initial` | `FastPath` |
/// | `FastPath` | `MethodMismatch`, `Authenticated`, `Rejected` |
/// | `MethodMismatch` | `SwitchResponseReceived` |
/// | `SwitchResponseReceived` | `Authenticated`, `Rejected` |
///
/// `Authenticated` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionPhase {
    /// No greeting sent yet
    #[default]
    Initial,
    /// Greeting sent, awaiting the handshake response
    FastPath,
    /// Auth switch requested, awaiting the switch response
    MethodMismatch,
    /// Switch response captured, verification pending
    SwitchResponseReceived,
    /// Login succeeded
    Authenticated,
    /// Login failed
    Rejected,
}

impl ConnectionPhase {
    /// Whether no further transitions are possible
    pub const fn is_terminal(self) -> bool {
        matches!(self, ConnectionPhase::Authenticated | ConnectionPhase::Rejected)
    }

    /// Whether `self -> next` is an edge of the transition table
    pub const fn can_transition_to(self, next: ConnectionPhase) -> bool {
        use ConnectionPhase::*;
        matches!(
            (self, next),
            (Initial, FastPath)
                | (FastPath, MethodMismatch)
                | (FastPath, Authenticated)
                | (FastPath, Rejected)
                | (MethodMismatch, SwitchResponseReceived)
                | (SwitchResponseReceived, Authenticated)
                | (SwitchResponseReceived, Rejected)
        )
    }

    /// Move to `next`, or fail with [`ProxyError::ProtocolViolation`] leaving
    /// the phase unchanged.
    pub fn transition(&mut self, next: ConnectionPhase) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(ProxyError::ProtocolViolation(format!(
                "Illegal phase transition {} -> {}",
                self, next
            )));
        }
        *self = next;
        Ok(())
    }

    /// Stable lower-case name, used in logs
    pub const fn as_str(self) -> &'static str {
        match self {
            ConnectionPhase::Initial => "initial",
            ConnectionPhase::FastPath => "fast_path",
            ConnectionPhase::MethodMismatch => "method_mismatch",
            ConnectionPhase::SwitchResponseReceived => "switch_response_received",
            ConnectionPhase::Authenticated => "authenticated",
            ConnectionPhase::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
