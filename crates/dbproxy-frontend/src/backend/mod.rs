//! Backend session state for a front-end connection.
//!
//! The authentication engine records the outcome of a successful login here:
//! the assigned connection id and the selected schema. Data-source pooling is
//! handled elsewhere; this is only the per-connection record.

use std::sync::Arc;

use crate::schema::SchemaDescriptor;

/// Per-connection backend state.
#[derive(Debug, Default, Clone)]
pub struct BackendConnection {
    connection_id: u32,
    username: Option<String>,
    current_schema: Option<Arc<SchemaDescriptor>>,
}

impl BackendConnection {
    /// Create an empty backend record
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection id assigned at handshake time (0 before the handshake)
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    pub fn set_connection_id(&mut self, connection_id: u32) {
        self.connection_id = connection_id;
    }

    /// Authenticated user, if any
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }

    /// Schema currently selected, if any
    pub fn current_schema(&self) -> Option<&Arc<SchemaDescriptor>> {
        self.current_schema.as_ref()
    }

    /// Name of the selected schema
    pub fn current_schema_name(&self) -> Option<&str> {
        self.current_schema.as_deref().map(|s| s.name.as_str())
    }

    pub fn set_current_schema(&mut self, schema: Option<Arc<SchemaDescriptor>>) {
        self.current_schema = schema;
    }

    /// Whether a user has been recorded
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }
}
