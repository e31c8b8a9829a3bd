//! Logging macros that set target to "dbproxy_frontend" for all log calls.
//!
//! Without an explicit target, tracing uses the full module path
//! (e.g., "dbproxy_frontend::frontend::engine"), which makes filtering by
//! component noisy when the front-end is embedded in a larger proxy process.
//! These macros pin every log line from this crate to a single target.

macro_rules! trace {
    ($($arg:tt)*) => { ::tracing::trace!(target: "dbproxy_frontend", $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { ::tracing::debug!(target: "dbproxy_frontend", $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { ::tracing::info!(target: "dbproxy_frontend", $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { ::tracing::warn!(target: "dbproxy_frontend", $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { ::tracing::error!(target: "dbproxy_frontend", $($arg)*) };
}
