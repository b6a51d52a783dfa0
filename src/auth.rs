use axum::http::{header, HeaderMap};
use base64::Engine;
use sha2::{Digest, Sha256};

pub const SESSION_COOKIE: &str = "session";

const SALT_BYTES: usize = 16;

/// Salted SHA-256, stored as `base64(salt)$base64(digest)`.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_BYTES] = rand::random();
    encode_password(&salt, password)
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_part, _)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = base64::engine::general_purpose::STANDARD.decode(salt_part) else {
        return false;
    };
    encode_password(&salt, password) == stored
}

fn encode_password(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    format!(
        "{}${}",
        base64::engine::general_purpose::STANDARD.encode(salt),
        base64::engine::general_purpose::STANDARD.encode(digest)
    )
}

/// 32 random bytes, base64url without padding. Only the SHA-256 of the token
/// is persisted, so a leaked sessions table cannot be replayed.
pub fn generate_token() -> String {
    let raw: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn session_cookie_from(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("session="))
        .map(|token| token.to_string())
        .filter(|token| !token.is_empty())
}

pub fn build_session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
