//! `data:` URL parsing and encoding.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::RasterError;

/// Payload of a parsed data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Parse `data:<mime>[;params][;base64],<payload>`.
///
/// The MIME type must look like `type/subtype`. Payloads without the
/// `;base64` marker are taken as raw text bytes.
pub fn decode_data_url(data_url: &str) -> Result<DecodedDataUrl, RasterError> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| RasterError::MalformedDataUrl("missing ',' separator".to_string()))?;

    let header = header
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| RasterError::MalformedDataUrl("missing 'data:' scheme".to_string()))?;

    let mut params = header.split(';');
    let mime_type = params.next().unwrap_or("").trim().to_ascii_lowercase();
    if !is_mime_type(&mime_type) {
        return Err(RasterError::MalformedDataUrl(format!(
            "no parseable MIME type in '{}'",
            header
        )));
    }
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| RasterError::MalformedDataUrl(format!("invalid base64 payload: {}", e)))?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok(DecodedDataUrl { mime_type, bytes })
}

/// Encode bytes as a base64 data URL.
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

fn is_mime_type(candidate: &str) -> bool {
    match candidate.split_once('/') {
        Some((kind, subtype)) => {
            let valid = |s: &str| {
                !s.is_empty()
                    && s
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
            };
            valid(kind) && valid(subtype)
        }
        None => false,
    }
}
