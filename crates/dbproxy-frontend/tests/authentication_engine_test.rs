//! Authentication engine behavior against substituted collaborators.
//!
//! The engine is driven directly: packets go in as byte slices and replies
//! are collected in a `Vec<OutboundPacket>` sink, so no sockets are involved.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dbproxy_frontend::auth::{AuthenticationHandler, LoginRequest};
use dbproxy_frontend::frontend::{
    AuthAttempt, AuthOutcome, AuthenticationEngine, ConnectionIdGenerator, ConnectionPhase,
    HandshakeContext, OutboundPacket, ServerPacket,
};
use dbproxy_frontend::protocol::mysql::{
    build_handshake_response41, compute_auth_response, verify_native_password, CapabilityFlags,
    HandshakeResponse41, ServerErrorCode, MYSQL_NATIVE_PASSWORD,
};
use dbproxy_frontend::schema::{SchemaDescriptor, SchemaResolver};
use dbproxy_frontend::BackendConnection;

static IDS: ConnectionIdGenerator = ConnectionIdGenerator::new();

const SCRAMBLE: [u8; 20] = [
    0x3b, 0x55, 0x78, 0x7d, 0x2c, 0x5f, 0x7c, 0x72, 0x49, 0x52, 0x3f, 0x28, 0x47, 0x6f, 0x77,
    0x28, 0x5b, 0x7c, 0x6f, 0x5c,
];

/// Resolver over a fixed set of names that counts lookups.
struct FixedSchemas {
    names: HashSet<String>,
    lookups: AtomicUsize,
}

impl FixedSchemas {
    fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            lookups: AtomicUsize::new(0),
        }
    }
}

impl SchemaResolver for FixedSchemas {
    fn resolve(&self, name: &str) -> Option<Arc<SchemaDescriptor>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.names
            .contains(name)
            .then(|| Arc::new(SchemaDescriptor::new(name)))
    }
}

/// Handler with a single account that records every login it sees.
struct SingleUserHandler {
    username: &'static str,
    password: &'static str,
    logins: Mutex<Vec<(String, Option<String>, Vec<u8>)>>,
    failure: Option<ServerErrorCode>,
}

impl SingleUserHandler {
    fn new(username: &'static str, password: &'static str) -> Self {
        Self {
            username,
            password,
            logins: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    fn login_count(&self) -> usize {
        self.logins.lock().unwrap().len()
    }
}

impl AuthenticationHandler for SingleUserHandler {
    fn login(&self, request: &LoginRequest<'_>) -> Result<(), ServerErrorCode> {
        self.logins.lock().unwrap().push((
            request.username.to_string(),
            request.database.map(String::from),
            request.scramble.to_vec(),
        ));
        if let Some(code) = self.failure {
            return Err(code);
        }
        if request.username == self.username
            && verify_native_password(self.password, request.scramble, request.auth_response)
        {
            Ok(())
        } else {
            Err(ServerErrorCode::AccessDenied)
        }
    }
}

struct Harness {
    engine: AuthenticationEngine,
    handler: Arc<SingleUserHandler>,
    schemas: Arc<FixedSchemas>,
    sink: Vec<OutboundPacket>,
    backend: BackendConnection,
}

impl Harness {
    fn new() -> Self {
        Self::with_handler(SingleUserHandler::new("root", "root"))
    }

    fn with_handler(handler: SingleUserHandler) -> Self {
        let handler = Arc::new(handler);
        let schemas = Arc::new(FixedSchemas::new(&["sharding_db"]));
        let engine = AuthenticationEngine::new(handler.clone(), schemas.clone())
            .with_id_generator(&IDS)
            .with_client_host("127.0.0.1");
        Self {
            engine,
            handler,
            schemas,
            sink: Vec::new(),
            backend: BackendConnection::new(),
        }
    }

    /// Engine already past the greeting, waiting in `phase`.
    fn at_phase(phase: ConnectionPhase) -> Self {
        let mut harness = Self::new();
        harness.engine = harness
            .engine
            .with_handshake_state(HandshakeContext::new(77, SCRAMBLE), phase);
        harness
    }

    fn auth(&mut self, sequence_id: u8, payload: &[u8]) -> dbproxy_frontend::Result<AuthOutcome> {
        self.engine
            .auth(&mut self.sink, sequence_id, payload, &mut self.backend)
    }

    fn last_error_code(&self) -> Option<u16> {
        self.sink.last().and_then(|p| p.packet.error_code())
    }
}

fn plugin_flags() -> CapabilityFlags {
    CapabilityFlags::CLIENT_PROTOCOL_41
        | CapabilityFlags::CLIENT_SECURE_CONNECTION
        | CapabilityFlags::CLIENT_PLUGIN_AUTH
        | CapabilityFlags::CLIENT_CONNECT_WITH_DB
}

fn login_packet(
    flags: CapabilityFlags,
    password: &str,
    database: Option<&str>,
    plugin: Option<&str>,
) -> Vec<u8> {
    build_handshake_response41(&HandshakeResponse41 {
        capability_flags: flags,
        username: "root".into(),
        auth_response: compute_auth_response(password, &SCRAMBLE),
        database: database.map(String::from),
        auth_plugin_name: plugin.map(String::from),
        ..HandshakeResponse41::default()
    })
}

fn native_login(password: &str, database: Option<&str>) -> Vec<u8> {
    login_packet(plugin_flags(), password, database, Some(MYSQL_NATIVE_PASSWORD))
}

#[test]
fn test_candidate_hash_is_deterministic() {
    for password in ["root", "p@ss w0rd", "\u{00e9}t\u{00e9}"] {
        assert_eq!(
            compute_auth_response(password, &SCRAMBLE),
            compute_auth_response(password, &SCRAMBLE)
        );
    }
}

#[test]
fn test_handshake_writes_one_greeting_and_assigns_id() {
    let mut harness = Harness::new();
    let id = harness
        .engine
        .handshake(&mut harness.sink, &mut harness.backend)
        .unwrap();

    assert_eq!(harness.sink.len(), 1);
    match &harness.sink[0].packet {
        ServerPacket::Handshake(greeting) => {
            assert_eq!(greeting.connection_id, id);
            assert_eq!(
                greeting.get_scramble(),
                harness.engine.context().unwrap().scramble().to_vec()
            );
        }
        other => panic!("expected greeting, got {:?}", other),
    }
    assert_eq!(harness.engine.phase(), ConnectionPhase::FastPath);
    assert_eq!(harness.backend.connection_id(), id);
}

#[test]
fn test_connection_ids_are_unique_per_engine() {
    let mut first = Harness::new();
    let mut second = Harness::new();
    let a = first
        .engine
        .handshake(&mut first.sink, &mut first.backend)
        .unwrap();
    let b = second
        .engine
        .handshake(&mut second.sink, &mut second.backend)
        .unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_missing_plugin_auth_requests_switch() {
    let mut harness = Harness::at_phase(ConnectionPhase::FastPath);
    let flags = plugin_flags() - CapabilityFlags::CLIENT_PLUGIN_AUTH;

    let outcome = harness
        .auth(1, &login_packet(flags, "root", Some("sharding_db"), None))
        .unwrap();

    assert_eq!(outcome, AuthOutcome::SwitchRequested);
    assert_eq!(harness.engine.phase(), ConnectionPhase::MethodMismatch);
    assert_eq!(harness.sink.len(), 1);
    match &harness.sink[0].packet {
        ServerPacket::AuthSwitchRequest(request) => {
            assert_eq!(request.plugin_name, MYSQL_NATIVE_PASSWORD);
            assert_eq!(request.plugin_data, SCRAMBLE.to_vec());
        }
        other => panic!("expected auth switch request, got {:?}", other),
    }
    assert_eq!(harness.sink[0].sequence_id, 2);
    assert_eq!(harness.handler.login_count(), 0);
}

#[test]
fn test_other_plugin_requests_switch() {
    let mut harness = Harness::at_phase(ConnectionPhase::FastPath);
    let packet = login_packet(plugin_flags(), "root", None, Some("caching_sha2_password"));

    let outcome = harness.auth(1, &packet).unwrap();

    assert_eq!(outcome, AuthOutcome::SwitchRequested);
    assert_eq!(harness.engine.phase(), ConnectionPhase::MethodMismatch);
}

#[test]
fn test_switch_response_is_stored_verbatim() {
    let raw: Vec<u8> = (0u8..20).map(|b| b.wrapping_mul(13)).collect();
    let mut harness = Harness::at_phase(ConnectionPhase::MethodMismatch);
    harness.engine = harness
        .engine
        .with_attempt(AuthAttempt::new("root").with_database("sharding_db"));

    harness.auth(3, &raw).unwrap();

    assert_eq!(harness.engine.auth_response(), raw.as_slice());
    assert_eq!(harness.engine.attempt().unwrap().auth_response, raw);
    assert_eq!(harness.sink.len(), 1);
}

#[test]
fn test_switch_round_reuses_original_scramble() {
    let mut harness = Harness::at_phase(ConnectionPhase::FastPath);
    let packet = login_packet(
        plugin_flags(),
        "ignored",
        Some("sharding_db"),
        Some("sha256_password"),
    );
    harness.auth(1, &packet).unwrap();
    assert_eq!(harness.engine.phase(), ConnectionPhase::MethodMismatch);

    let outcome = harness
        .auth(3, &compute_auth_response("root", &SCRAMBLE))
        .unwrap();

    assert_eq!(outcome, AuthOutcome::Authenticated);
    assert_eq!(harness.engine.phase(), ConnectionPhase::Authenticated);
    assert_eq!(harness.sink.len(), 2);
    assert!(harness.sink[1].packet.is_ok());
    assert_eq!(harness.sink[1].sequence_id, 4);

    let logins = harness.handler.logins.lock().unwrap();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].0, "root");
    assert_eq!(logins[0].1.as_deref(), Some("sharding_db"));
    assert_eq!(logins[0].2, SCRAMBLE.to_vec());
}

#[test]
fn test_switch_round_wrong_password_is_rejected() {
    let mut harness = Harness::at_phase(ConnectionPhase::MethodMismatch);
    harness.engine = harness.engine.with_attempt(AuthAttempt::new("root"));

    let outcome = harness
        .auth(3, &compute_auth_response("nope", &SCRAMBLE))
        .unwrap();

    assert_eq!(outcome, AuthOutcome::Rejected(ServerErrorCode::AccessDenied));
    assert_eq!(harness.engine.phase(), ConnectionPhase::Rejected);
    assert_eq!(harness.last_error_code(), Some(1045));
}

#[test]
fn test_login_failure() {
    let mut harness = Harness::at_phase(ConnectionPhase::FastPath);

    let outcome = harness
        .auth(1, &native_login("wrong", Some("sharding_db")))
        .unwrap();

    assert_eq!(outcome, AuthOutcome::Rejected(ServerErrorCode::AccessDenied));
    assert_eq!(harness.engine.phase(), ConnectionPhase::Rejected);
    assert_eq!(harness.sink.len(), 1);
    match &harness.sink[0].packet {
        ServerPacket::Err(err) => {
            assert_eq!(err.error_code, 1045);
            assert_eq!(&err.sql_state, b"28000");
            assert_eq!(
                err.error_message,
                "Access denied for user 'root'@'127.0.0.1' (using password: YES)"
            );
        }
        other => panic!("expected ERR, got {:?}", other),
    }
    assert!(!harness.backend.is_authenticated());
}

#[test]
fn test_unknown_database_rejected_regardless_of_password() {
    for password in ["root", "wrong"] {
        let mut harness = Harness::at_phase(ConnectionPhase::FastPath);

        let outcome = harness
            .auth(1, &native_login(password, Some("ABSENT DATABASE")))
            .unwrap();

        assert_eq!(outcome, AuthOutcome::Rejected(ServerErrorCode::DbAccessDenied));
        assert_eq!(harness.engine.phase(), ConnectionPhase::Rejected);
        assert_eq!(harness.sink.len(), 1);
        match &harness.sink[0].packet {
            ServerPacket::Err(err) => {
                assert_eq!(err.error_code, 1044);
                assert_eq!(
                    err.error_message,
                    "Access denied for user 'root'@'127.0.0.1' to database 'ABSENT DATABASE'"
                );
            }
            other => panic!("expected ERR, got {:?}", other),
        }
        assert_eq!(harness.handler.login_count(), 0);
        assert_eq!(harness.schemas.lookups.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_successful_login() {
    let mut harness = Harness::at_phase(ConnectionPhase::FastPath);

    let outcome = harness
        .auth(1, &native_login("root", Some("sharding_db")))
        .unwrap();

    assert_eq!(outcome, AuthOutcome::Authenticated);
    assert_eq!(harness.engine.phase(), ConnectionPhase::Authenticated);
    assert_eq!(harness.sink.len(), 1);
    assert!(harness.sink[0].packet.is_ok());
    assert_eq!(harness.sink[0].sequence_id, 2);
    assert_eq!(harness.backend.connection_id(), 77);
    assert_eq!(harness.backend.current_schema_name(), Some("sharding_db"));
    assert_eq!(harness.backend.username(), Some("root"));
}

#[test]
fn test_login_without_database_skips_registry() {
    let mut harness = Harness::at_phase(ConnectionPhase::FastPath);

    let outcome = harness.auth(1, &native_login("root", None)).unwrap();

    assert_eq!(outcome, AuthOutcome::Authenticated);
    assert_eq!(harness.schemas.lookups.load(Ordering::SeqCst), 0);
    assert!(harness.backend.current_schema().is_none());
}

#[test]
fn test_handler_error_code_is_reported() {
    let mut handler = SingleUserHandler::new("root", "root");
    handler.failure = Some(ServerErrorCode::NotSupportedAuthMode);
    let mut harness = Harness::with_handler(handler);
    harness.engine = harness
        .engine
        .with_handshake_state(HandshakeContext::new(5, SCRAMBLE), ConnectionPhase::FastPath);

    let outcome = harness.auth(1, &native_login("root", None)).unwrap();

    assert_eq!(
        outcome,
        AuthOutcome::Rejected(ServerErrorCode::NotSupportedAuthMode)
    );
    assert_eq!(harness.last_error_code(), Some(1251));
}

#[test]
fn test_repeat_delivery_after_success_is_violation() {
    let mut harness = Harness::at_phase(ConnectionPhase::FastPath);
    let packet = native_login("root", Some("sharding_db"));
    harness.auth(1, &packet).unwrap();
    assert_eq!(harness.sink.len(), 1);

    let err = harness.auth(1, &packet).unwrap_err();

    assert!(err.is_protocol_violation());
    assert_eq!(harness.sink.len(), 1);
    assert_eq!(harness.engine.phase(), ConnectionPhase::Authenticated);
}

#[test]
fn test_packets_after_rejection_are_violations() {
    let mut harness = Harness::at_phase(ConnectionPhase::FastPath);
    harness.auth(1, &native_login("wrong", None)).unwrap();

    let err = harness.auth(3, &native_login("root", None)).unwrap_err();

    assert!(err.is_protocol_violation());
    assert_eq!(harness.sink.len(), 1);
    assert_eq!(harness.engine.phase(), ConnectionPhase::Rejected);
}

#[test]
fn test_auth_in_non_accepting_phases_emits_nothing() {
    for phase in [
        ConnectionPhase::Initial,
        ConnectionPhase::SwitchResponseReceived,
        ConnectionPhase::Authenticated,
        ConnectionPhase::Rejected,
    ] {
        let mut harness = Harness::at_phase(phase);
        let err = harness.auth(1, &native_login("root", None)).unwrap_err();
        assert!(err.is_protocol_violation(), "phase {}", phase);
        assert!(harness.sink.is_empty());
        assert_eq!(harness.engine.phase(), phase);
    }
}

#[test]
fn test_malformed_fast_path_packet() {
    let mut harness = Harness::at_phase(ConnectionPhase::FastPath);
    let mut packet = native_login("root", None);
    // Drop the username terminator and everything after it
    packet.truncate(32 + 2);

    let outcome = harness.auth(1, &packet).unwrap();

    assert_eq!(outcome, AuthOutcome::Rejected(ServerErrorCode::HandshakeError));
    assert_eq!(harness.last_error_code(), Some(1043));
    assert_eq!(harness.handler.login_count(), 0);
}
