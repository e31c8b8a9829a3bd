//! Configuration module for dbproxy-frontend
//!
//! ```yaml
//! server:
//!   listen_address: "127.0.0.1"
//!   listen_port: 3307
//!   handshake_timeout_secs: 30
//!
//! users:
//!   - username: root
//!     password: "${ROOT_PASSWORD}"
//!     authorized_schemas: [sharding_db]
//!
//! schemas:
//!   sharding_db:
//!     data_sources: [ds_0, ds_1]
//!
//! logging:
//!   level: info
//! ```

mod loader;
mod types;

pub use loader::{apply_env_overrides, load_config, load_config_from_str};
pub use types::*;
