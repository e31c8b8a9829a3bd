//! `mysql_native_password` authentication handler.

use std::sync::Arc;

use crate::protocol::mysql::ServerErrorCode;

use super::{AuthenticationHandler, LoginRequest, UserRegistry};

/// Verifies `mysql_native_password` responses against a [`UserRegistry`].
///
/// Checks, in order:
/// 1. the user exists, else `AccessDenied`;
/// 2. the response verifies against the user's password, else `AccessDenied`;
/// 3. the requested database, if any, is one the user may use, else `DbAccessDenied`.
#[derive(Debug, Clone)]
pub struct NativePasswordAuthenticationHandler {
    users: Arc<UserRegistry>,
}

impl NativePasswordAuthenticationHandler {
    /// Create a handler backed by `users`
    pub fn new(users: Arc<UserRegistry>) -> Self {
        Self { users }
    }

    /// The registry this handler checks against
    pub fn users(&self) -> &Arc<UserRegistry> {
        &self.users
    }
}

impl AuthenticationHandler for NativePasswordAuthenticationHandler {
    fn login(&self, request: &LoginRequest<'_>) -> Result<(), ServerErrorCode> {
        let Some(user) = self.users.get(request.username) else {
            debug!(user = request.username, "Login for unknown user");
            return Err(ServerErrorCode::AccessDenied);
        };

        if !user.verify(request.scramble, request.auth_response) {
            debug!(user = request.username, "Password verification failed");
            return Err(ServerErrorCode::AccessDenied);
        }

        if let Some(database) = request.database {
            if !user.is_authorized_for(database) {
                debug!(
                    user = request.username,
                    database, "User not authorized for database"
                );
                return Err(ServerErrorCode::DbAccessDenied);
            }
        }

        Ok(())
    }

    fn authorize_schema(&self, username: &str, schema: &str) -> bool {
        self.users
            .get(username)
            .map(|user| user.is_authorized_for(schema))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ProxyUser;
    use crate::protocol::mysql::{compute_auth_response, generate_scramble};

    fn handler() -> NativePasswordAuthenticationHandler {
        let users = UserRegistry::new(vec![
            ProxyUser::new("root", "root"),
            ProxyUser::new("app", "secret").with_authorized_schemas(["sharding_db"]),
        ]);
        NativePasswordAuthenticationHandler::new(Arc::new(users))
    }

    fn request<'a>(
        username: &'a str,
        auth_response: &'a [u8],
        database: Option<&'a str>,
        scramble: &'a [u8],
    ) -> LoginRequest<'a> {
        LoginRequest {
            username,
            host: "127.0.0.1",
            auth_response,
            database,
            scramble,
        }
    }

    #[test]
    fn test_login_success() {
        let scramble = generate_scramble();
        let response = compute_auth_response("root", &scramble);
        let result = handler().login(&request("root", &response, Some("sharding_db"), &scramble));
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_login_unknown_user() {
        let scramble = generate_scramble();
        let response = compute_auth_response("root", &scramble);
        let result = handler().login(&request("nobody", &response, None, &scramble));
        assert_eq!(result, Err(ServerErrorCode::AccessDenied));
    }

    #[test]
    fn test_login_wrong_password() {
        let scramble = generate_scramble();
        let response = compute_auth_response("wrong", &scramble);
        let result = handler().login(&request("root", &response, None, &scramble));
        assert_eq!(result, Err(ServerErrorCode::AccessDenied));
    }

    #[test]
    fn test_login_unauthorized_database() {
        let scramble = generate_scramble();
        let response = compute_auth_response("secret", &scramble);
        let handler = handler();
        assert_eq!(
            handler.login(&request("app", &response, Some("sharding_db"), &scramble)),
            Ok(())
        );
        assert_eq!(
            handler.login(&request("app", &response, Some("analytics"), &scramble)),
            Err(ServerErrorCode::DbAccessDenied)
        );
    }

    #[test]
    fn test_password_checked_before_database() {
        let scramble = generate_scramble();
        let response = compute_auth_response("wrong", &scramble);
        let result = handler().login(&request("app", &response, Some("analytics"), &scramble));
        assert_eq!(result, Err(ServerErrorCode::AccessDenied));
    }

    #[test]
    fn test_authorize_schema() {
        let handler = handler();
        assert!(handler.authorize_schema("root", "anything"));
        assert!(handler.authorize_schema("app", "sharding_db"));
        assert!(!handler.authorize_schema("app", "analytics"));
        assert!(!handler.authorize_schema("nobody", "sharding_db"));
    }
}
