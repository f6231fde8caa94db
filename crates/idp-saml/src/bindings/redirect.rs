//! HTTP-Redirect binding.
//!
//! Messages travel as raw DEFLATE (no zlib header), then base64, then URL
//! encoding. Query extraction already undoes the URL encoding, so the
//! functions here work on the base64 text.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{SamlError, SamlResult};

use super::{compact_base64, MAX_DECOMPRESSED_SIZE, MAX_ENCODED_SIZE_REDIRECT};

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Deflates and base64-encodes a message.
    pub fn encode(xml: &str) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
    }

    /// Decodes a base64 + DEFLATE message into XML.
    ///
    /// Rejects input over [`MAX_ENCODED_SIZE_REDIRECT`] before decoding and
    /// output that reaches [`MAX_DECOMPRESSED_SIZE`] while inflating.
    pub fn decode(encoded: &str) -> SamlResult<String> {
        if encoded.len() > MAX_ENCODED_SIZE_REDIRECT {
            return Err(SamlError::TooLarge(format!(
                "encoded message exceeds {MAX_ENCODED_SIZE_REDIRECT} bytes"
            )));
        }

        let compressed = base64::engine::general_purpose::STANDARD.decode(compact_base64(encoded))?;
        let xml_bytes = deflate_decompress(&compressed)?;

        String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::InvalidRequest(format!("Invalid UTF-8 in message: {e}")))
    }
}

/// Compresses data using DEFLATE (raw, no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Deflate(format!("Compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Deflate(format!("Compression finish error: {e}")))
}

/// Decompresses DEFLATE data, bounded by [`MAX_DECOMPRESSED_SIZE`].
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decompressed = Vec::new();
    DeflateDecoder::new(data)
        .take(MAX_DECOMPRESSED_SIZE)
        .read_to_end(&mut decompressed)
        .map_err(|e| SamlError::Deflate(format!("Decompression error: {e}")))?;

    if decompressed.len() as u64 >= MAX_DECOMPRESSED_SIZE {
        return Err(SamlError::TooLarge(format!(
            "inflated message reaches {MAX_DECOMPRESSED_SIZE} bytes"
        )));
    }
    Ok(decompressed)
}
