//! Connection id assignment.

use std::sync::atomic::{AtomicU32, Ordering};

static GLOBAL: ConnectionIdGenerator = ConnectionIdGenerator::new();

/// Monotonic source of connection ids, starting at 1.
///
/// Ids wrap after `u32::MAX`; 0 is never handed out.
#[derive(Debug)]
pub struct ConnectionIdGenerator {
    next: AtomicU32,
}

impl ConnectionIdGenerator {
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    pub const fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }

    /// The process-wide generator
    pub fn global() -> &'static ConnectionIdGenerator {
        &GLOBAL
    }

    pub fn next_id(&self) -> u32 {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }
}

impl Default for ConnectionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
