//! Request fingerprinting for change detection.
//!
//! The host caches pipeline results keyed on a deterministic digest of the
//! request. The digest has no cryptographic-security requirement; it only
//! needs collision resistance adequate for "has this request changed".

use crate::request::IngestRequest;

/// Computes a BLAKE3 digest over an ordered list of request fields.
///
/// Each field is prefixed with its byte length (u64, little-endian) so that
/// field boundaries are unambiguous: `["ab", "c"]` and `["a", "bc"]` hash
/// differently.
///
/// # Returns
/// * A 64-character lowercase hexadecimal string
pub fn fingerprint_fields(fields: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for field in fields {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Computes the change-detection fingerprint for a request.
///
/// Every semantically significant field feeds the digest, so flipping the
/// save flag or renaming the prefix counts as a changed request. The
/// payload is trimmed of surrounding whitespace first, matching what the
/// decode stage actually consumes.
pub fn request_fingerprint(request: &IngestRequest) -> String {
    let duration = request.record_duration_max.to_string();
    let save = if request.save_audio { "1" } else { "0" };
    fingerprint_fields(&[
        request.base64_data.trim(),
        &duration,
        save,
        &request.file_prefix,
    ])
}
