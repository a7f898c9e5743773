//! Wire payload for host delivery and the redirect fallback.
//!
//! The fallback channel carries the whole batch in a query parameter:
//! JSON, UTF-8, base64, percent-encoded. Decode is lenient about shape
//! (a bare metadata array is accepted for older payloads) but any
//! malformed input surfaces as a recoverable [`DecodeError`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::record::FileRecord;

/// The batch as delivered to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsPayload {
    pub metadata: Vec<FileRecord>,
    #[serde(default)]
    pub timeline: Vec<String>,
    #[serde(default)]
    pub payload_size_hint: u64,
}

impl ResultsPayload {
    /// Build a payload; the size hint is the serialized length of the
    /// records and timeline.
    pub fn new(metadata: Vec<FileRecord>, timeline: Vec<String>) -> Self {
        let mut payload = Self {
            metadata,
            timeline,
            payload_size_hint: 0,
        };
        payload.payload_size_hint = serde_json::to_string(&payload)
            .map(|s| s.len() as u64)
            .unwrap_or(0);
        payload
    }
}

/// Why an inbound fallback payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload JSON malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a payload for the query-parameter channel (before percent
/// encoding).
pub fn encode_results(payload: &ResultsPayload) -> Result<String, serde_json::Error> {
    Ok(STANDARD.encode(serde_json::to_string(payload)?))
}

/// Decode a query-parameter payload. Accepts both the full payload
/// object and a bare metadata array.
pub fn decode_results(param: &str) -> Result<ResultsPayload, DecodeError> {
    let bytes = STANDARD.decode(param.trim())?;
    let text = String::from_utf8(bytes)?;
    if let Ok(payload) = serde_json::from_str::<ResultsPayload>(&text) {
        return Ok(payload);
    }
    let metadata: Vec<FileRecord> = serde_json::from_str(&text)?;
    Ok(ResultsPayload {
        metadata,
        timeline: Vec::new(),
        payload_size_hint: 0,
    })
}

/// Navigation URL for the redirect fallback.
pub fn results_url(base: &str, encoded: &str) -> String {
    format!(
        "{}?results={}",
        base.trim_end_matches('/'),
        urlencoded(encoded)
    )
}

/// Pull the `results` parameter back out of a navigation URL.
pub fn extract_results_param(url: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("results="))
        .and_then(urldecoded)
}

/// Minimal percent-encoding for query parameter values.
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0x0f) as usize]));
            }
        }
    }
    out
}

fn urldecoded(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = hex_val(*bytes.get(i + 1)?)?;
                let lo = hex_val(*bytes.get(i + 2)?)?;
                out.push((hi << 4) | lo);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

fn hex_val(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

const HEX: [u8; 16] = *b"0123456789ABCDEF";
