//! Session token generation

use rand::Rng;

/// Prefix that marks a string as a charging-session token
pub const TOKEN_PREFIX: &str = "chg_";

const TOKEN_BYTES: usize = 32;

/// `chg_<64 hex chars>`: 32 bytes from the thread-local CSPRNG
pub fn generate_session_token() -> String {
    let random_bytes: [u8; TOKEN_BYTES] = rand::thread_rng().gen();
    format!("{}{}", TOKEN_PREFIX, hex::encode(random_bytes))
}
