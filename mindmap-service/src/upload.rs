//! Upload validation and content fingerprinting.
//!
//! Everything here runs before any network exchange: a rejected file never
//! reaches the summarization service and changes no session state.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use mindmap_core::MindMapError;
use sha2::{Digest, Sha256};

pub const MAX_PDF_BYTES: usize = 5 * 1024 * 1024;
pub const PDF_MIME: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Decode an uploaded file payload. Accepts either bare base64 or a full
/// `data:` URL as produced by a browser `FileReader`.
pub fn decode_upload(data: &str) -> Result<Vec<u8>, MindMapError> {
    let encoded = match data.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => data,
    };
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| MindMapError::MalformedInput(format!("invalid base64 payload: {e}")))
}

/// Reject anything that is not a PDF under the size cap.
pub fn validate_pdf(bytes: &[u8]) -> Result<(), MindMapError> {
    if bytes.len() > MAX_PDF_BYTES {
        return Err(MindMapError::MalformedInput(
            "Only PDF files under 5MB are allowed".into(),
        ));
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(MindMapError::MalformedInput(
            "File is not a PDF document".into(),
        ));
    }
    Ok(())
}

/// SHA-256 hex fingerprint of the document content, used as the cache key.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
