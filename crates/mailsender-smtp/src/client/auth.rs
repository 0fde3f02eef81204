//! SASL token encoding for the supported AUTH mechanisms.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use md5::Md5;

use crate::error::{Error, Result};
use crate::parser::reply_payload;

type HmacMd5 = Hmac<Md5>;

/// LOGIN prompt for the user name (`Username:`).
pub const USERNAME_PROMPT: &str = "334 VXNlcm5hbWU6";

/// LOGIN prompt for the password (`Password:`).
pub const PASSWORD_PROMPT: &str = "334 UGFzc3dvcmQ6";

/// Builds the PLAIN initial response: `base64("\0user\0pass")`.
#[must_use]
pub fn plain_token(username: &str, password: &str) -> String {
    STANDARD.encode(format!("\0{username}\0{password}"))
}

/// Encodes one LOGIN answer.
#[must_use]
pub fn login_token(value: &str) -> String {
    STANDARD.encode(value)
}

/// Decodes the base64 challenge carried by a `334` line.
///
/// # Errors
///
/// Returns a protocol error if the challenge is not valid base64.
pub fn decode_challenge(line: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(reply_payload(line).trim())
        .map_err(|e| Error::Protocol(format!("Invalid CRAM-MD5 challenge: {e}")))
}

/// Computes the CRAM-MD5 answer: `base64("user hex(hmac_md5(password, challenge))")`.
///
/// # Errors
///
/// Returns an error if the HMAC cannot be keyed.
pub fn cram_md5_response(username: &str, password: &str, challenge: &[u8]) -> Result<String> {
    let mut mac = HmacMd5::new_from_slice(password.as_bytes())
        .map_err(|e| Error::Protocol(format!("Invalid CRAM-MD5 key: {e}")))?;
    mac.update(challenge);
    let digest = hex::encode(mac.finalize().into_bytes());
    Ok(STANDARD.encode(format!("{username} {digest}")))
}
