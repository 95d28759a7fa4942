//! Base64 wrapping applied to document content on the remote channel only.
//!
//! Remote stores commonly wrap encoded content at 60 or 76 columns, so
//! decoding ignores ASCII whitespace.

use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Encode document text for transport.
///
/// # Examples
/// ```
/// use greenmap_core::remote::transport::{decode, encode};
///
/// let wire = encode("{\"city\":\"Бийск\"}");
/// assert_eq!(decode(&wire)?, "{\"city\":\"Бийск\"}");
/// # Ok::<(), greenmap_core::ParseError>(())
/// ```
#[must_use]
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode transport content back into UTF-8 text.
pub fn decode(encoded: &str) -> Result<String, crate::ParseError> {
    let cleaned: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|err| crate::ParseError::Transport {
            message: err.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|err| crate::ParseError::Transport {
        message: err.to_string(),
    })
}
