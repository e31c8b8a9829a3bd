//! Front-end authentication.
//!
//! The core abstraction is the [`AuthenticationHandler`] trait: given the
//! username, the client's scrambled response and the requested database, it
//! decides whether the login succeeds and, if not, which error the client sees.
//!
//! - [`AuthenticationHandler`] - Trait for pluggable login checks
//! - [`LoginRequest`] - One login attempt as seen by a handler
//! - [`NativePasswordAuthenticationHandler`] - `mysql_native_password` against configured users
//! - [`UserRegistry`] / [`ProxyUser`] - Hot-reloadable proxy accounts
//!
//! # Security
//!
//! Passwords are held in [`zeroize::Zeroizing`] buffers and erased on drop.
//! [`ProxyUser`]'s `Debug` output redacts them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use dbproxy_frontend::auth::{
//!     AuthenticationHandler, NativePasswordAuthenticationHandler, ProxyUser, UserRegistry,
//! };
//!
//! let users = Arc::new(UserRegistry::new(vec![ProxyUser::new("root", "secret")]));
//! let handler: Arc<dyn AuthenticationHandler> =
//!     Arc::new(NativePasswordAuthenticationHandler::new(users));
//! assert_eq!(handler.auth_plugin_name(), "mysql_native_password");
//! ```

mod handler;
mod native;
mod user;

pub use handler::{AuthenticationHandler, LoginRequest};
pub use native::NativePasswordAuthenticationHandler;
pub use user::{ProxyUser, UserRegistry};
