//! Opaque bearer tokens issued by the identity backends.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::IdToken;

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

/// Generate a fresh random token.
#[must_use]
pub fn generate() -> IdToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    IdToken::new(URL_SAFE_NO_PAD.encode(bytes))
}

/// Digest stored in place of the token itself.
#[must_use]
pub fn digest(token: &IdToken) -> String {
    hex::encode(Sha256::digest(token.expose().as_bytes()))
}
