//! Command-phase responder for authenticated connections.
//!
//! Only the commands needed to keep a session alive are answered here:
//! `COM_QUIT`, `COM_PING` and `COM_INIT_DB`. Everything else gets
//! `ER_UNKNOWN_COM_ERROR`; query execution lives behind the proxy's router.

use std::sync::Arc;

use crate::auth::AuthenticationHandler;
use crate::backend::BackendConnection;
use crate::frontend::{PacketSink, ResponseEmitter};
use crate::protocol::mysql::{ServerErrorCode, COM_INIT_DB, COM_PING, COM_QUIT};
use crate::schema::SchemaResolver;

/// What the transport should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Keep reading commands
    Continue,
    /// Close the connection without replying
    Close,
}

/// Answers commands for one authenticated connection.
pub struct CommandResponder {
    handler: Arc<dyn AuthenticationHandler>,
    schemas: Arc<dyn SchemaResolver>,
    emitter: ResponseEmitter,
    client_host: String,
}

impl CommandResponder {
    pub fn new(
        handler: Arc<dyn AuthenticationHandler>,
        schemas: Arc<dyn SchemaResolver>,
        client_host: impl Into<String>,
    ) -> Self {
        Self {
            handler,
            schemas,
            emitter: ResponseEmitter::default(),
            client_host: client_host.into(),
        }
    }

    /// Handle one command packet, writing at most one reply to `sink`.
    pub fn respond(
        &mut self,
        sink: &mut dyn PacketSink,
        sequence_id: u8,
        payload: &[u8],
        backend: &mut BackendConnection,
    ) -> CommandAction {
        self.emitter.reply_to(sequence_id);

        let Some((&command, body)) = payload.split_first() else {
            self.emitter
                .send_error(sink, ServerErrorCode::UnknownCommand, &[]);
            return CommandAction::Continue;
        };

        match command {
            COM_QUIT => {
                debug!(connection_id = backend.connection_id(), "Client quit");
                CommandAction::Close
            }
            COM_PING => {
                self.emitter.send_ok(sink);
                CommandAction::Continue
            }
            COM_INIT_DB => {
                self.init_db(sink, body, backend);
                CommandAction::Continue
            }
            other => {
                debug!(
                    connection_id = backend.connection_id(),
                    command = other,
                    "Unsupported command"
                );
                self.emitter
                    .send_error(sink, ServerErrorCode::UnknownCommand, &[]);
                CommandAction::Continue
            }
        }
    }

    /// Switch the current schema.
    ///
    /// Grants are checked before existence: a schema outside the user's
    /// grants is `ER_DBACCESS_DENIED_ERROR` whether or not it exists.
    fn init_db(
        &mut self,
        sink: &mut dyn PacketSink,
        body: &[u8],
        backend: &mut BackendConnection,
    ) {
        let requested = String::from_utf8_lossy(body);
        let schema_name: &str = &requested;
        let username = backend.username().unwrap_or("").to_string();

        if !self.handler.authorize_schema(&username, schema_name) {
            let args = [username.as_str(), self.client_host.as_str(), schema_name];
            self.emitter
                .send_error(sink, ServerErrorCode::DbAccessDenied, &args);
            return;
        }

        let Some(schema) = self.schemas.resolve(schema_name) else {
            self.emitter
                .send_error(sink, ServerErrorCode::BadDb, &[schema_name]);
            return;
        };

        info!(
            connection_id = backend.connection_id(),
            user = %username,
            database = %schema_name,
            "Schema changed"
        );
        backend.set_current_schema(Some(schema));
        self.emitter.send_ok(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{NativePasswordAuthenticationHandler, ProxyUser, UserRegistry};
    use crate::frontend::{OutboundPacket, ServerPacket};
    use crate::schema::{SchemaDescriptor, SchemaRegistry, SchemaSnapshot};

    fn responder() -> CommandResponder {
        let users = UserRegistry::new(vec![
            ProxyUser::new("app", "secret").with_authorized_schemas(["sharding_db"]),
            ProxyUser::new("admin", "secret"),
        ]);
        let schemas = SchemaRegistry::new(SchemaSnapshot::new([
            SchemaDescriptor::new("sharding_db"),
            SchemaDescriptor::new("analytics"),
        ]));
        CommandResponder::new(
            Arc::new(NativePasswordAuthenticationHandler::new(Arc::new(users))),
            Arc::new(schemas),
            "127.0.0.1",
        )
    }

    fn backend() -> BackendConnection {
        backend_for("app")
    }

    fn backend_for(username: &str) -> BackendConnection {
        let mut backend = BackendConnection::new();
        backend.set_connection_id(5);
        backend.set_username(username);
        backend
    }

    fn init_db(schema: &str) -> Vec<u8> {
        let mut payload = vec![COM_INIT_DB];
        payload.extend_from_slice(schema.as_bytes());
        payload
    }

    #[test]
    fn test_ping() {
        let mut sink: Vec<OutboundPacket> = Vec::new();
        let action = responder().respond(&mut sink, 0, &[COM_PING], &mut backend());
        assert_eq!(action, CommandAction::Continue);
        assert_eq!(sink.len(), 1);
        assert!(sink[0].packet.is_ok());
        assert_eq!(sink[0].sequence_id, 1);
    }

    #[test]
    fn test_quit_sends_nothing() {
        let mut sink: Vec<OutboundPacket> = Vec::new();
        let action = responder().respond(&mut sink, 0, &[COM_QUIT], &mut backend());
        assert_eq!(action, CommandAction::Close);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_init_db() {
        let mut sink: Vec<OutboundPacket> = Vec::new();
        let mut backend = backend();
        responder().respond(&mut sink, 0, &init_db("sharding_db"), &mut backend);
        assert!(sink[0].packet.is_ok());
        assert_eq!(backend.current_schema_name(), Some("sharding_db"));
    }

    #[test]
    fn test_init_db_unknown_schema_for_restricted_user() {
        let mut sink: Vec<OutboundPacket> = Vec::new();
        let mut backend = backend();

        responder().respond(&mut sink, 0, &init_db("missing"), &mut backend);
        assert_eq!(sink[0].packet.error_code(), Some(1044));
        assert!(backend.current_schema().is_none());
    }

    #[test]
    fn test_init_db_unauthorized_schema() {
        let mut sink: Vec<OutboundPacket> = Vec::new();
        let mut backend = backend();

        responder().respond(&mut sink, 0, &init_db("analytics"), &mut backend);
        assert_eq!(sink[0].packet.error_code(), Some(1044));
        assert!(backend.current_schema().is_none());
    }

    #[test]
    fn test_init_db_does_not_reveal_schema_existence() {
        let mut responder = responder();
        let mut backend = backend();
        let mut sink: Vec<OutboundPacket> = Vec::new();

        responder.respond(&mut sink, 0, &init_db("analytics"), &mut backend);
        responder.respond(&mut sink, 0, &init_db("nope"), &mut backend);
        assert_eq!(sink.len(), 2);

        let replies: Vec<_> = sink
            .iter()
            .map(|p| match &p.packet {
                ServerPacket::Err(err) => (err.error_code, err.sql_state),
                other => panic!("expected ERR, got {:?}", other),
            })
            .collect();
        assert_eq!(replies[0], replies[1]);
    }

    #[test]
    fn test_init_db_unknown_schema_for_unrestricted_user() {
        let mut sink: Vec<OutboundPacket> = Vec::new();
        let mut backend = backend_for("admin");

        responder().respond(&mut sink, 0, &init_db("missing"), &mut backend);
        assert_eq!(sink[0].packet.error_code(), Some(1049));

        sink.clear();
        responder().respond(&mut sink, 0, &init_db("analytics"), &mut backend);
        assert!(sink[0].packet.is_ok());
        assert_eq!(backend.current_schema_name(), Some("analytics"));
    }

    #[test]
    fn test_unknown_and_empty_commands() {
        let mut responder = responder();
        let mut backend = backend();
        let mut sink: Vec<OutboundPacket> = Vec::new();

        responder.respond(&mut sink, 0, b"\x03SELECT 1", &mut backend);
        responder.respond(&mut sink, 0, &[], &mut backend);
        assert_eq!(sink.len(), 2);
        assert!(sink.iter().all(|p| p.packet.error_code() == Some(1047)));
    }
}
