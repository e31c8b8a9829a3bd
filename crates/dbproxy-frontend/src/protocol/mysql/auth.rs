//! MySQL `mysql_native_password` challenge-response
//!
//! Reference: <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_authentication_methods_native_password_authentication.html>

use rand::Rng;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

use super::packets::SCRAMBLE_LENGTH;

/// Generate a random 20-byte scramble for authentication
pub fn generate_scramble() -> [u8; SCRAMBLE_LENGTH] {
    let mut rng = rand::thread_rng();
    let mut scramble = [0u8; SCRAMBLE_LENGTH];

    // Null bytes would terminate the scramble early on the wire,
    // 0xFF collides with the ERR header in some client parsers.
    for byte in scramble.iter_mut() {
        *byte = loop {
            let b: u8 = rng.gen();
            if b != 0 && b != 0xFF {
                break b;
            }
        };
    }

    scramble
}

/// Compute the auth response for mysql_native_password
///
/// Algorithm:
/// ```text
/// SHA1( password ) XOR SHA1( scramble + SHA1( SHA1( password ) ) )
/// ```
///
/// An empty password yields an empty response, which is what clients send
/// for password-less accounts.
pub fn compute_auth_response(password: &str, scramble: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    // SHA1(password)
    let stage1 = Sha1::digest(password.as_bytes());

    // SHA1(SHA1(password))
    let stage2 = Sha1::digest(stage1);

    // SHA1(scramble + SHA1(SHA1(password)))
    let mut hasher = Sha1::new();
    hasher.update(scramble);
    hasher.update(stage2);
    let token = hasher.finalize();

    // XOR stage1 with token
    stage1
        .iter()
        .zip(token.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

/// Verify a client's scrambled password against the plaintext password.
///
/// Zero-length inputs and length mismatches fail verification. The final
/// comparison runs in constant time.
pub fn verify_native_password(password: &str, scramble: &[u8], client_response: &[u8]) -> bool {
    if scramble.is_empty() || client_response.is_empty() {
        return false;
    }

    let candidate = compute_auth_response(password, scramble);
    if candidate.len() != client_response.len() {
        return false;
    }

    candidate.ct_eq(client_response).into()
}
