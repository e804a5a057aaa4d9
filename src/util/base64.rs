use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::engine::Engine as _;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeBase64Error;

impl fmt::Display for DecodeBase64Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode base64 string")
    }
}

impl std::error::Error for DecodeBase64Error {}

/// Encodes bytes with the URL-safe alphabet and no padding, the form push services
/// use for keys.
pub fn url_safe_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes a key published in either base64 alphabet, with or without padding.
pub fn decode_key(input: &str) -> Result<Vec<u8>, DecodeBase64Error> {
    let trimmed = input.trim().trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(DecodeBase64Error);
    }
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|_err| DecodeBase64Error)
}
