use mime::Mime;

/// Content types accepted when no allow-list is configured
pub const DEFAULT_ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Normalizes a `Content-Type` value to its lower-cased essence (`type/subtype`).
///
/// Returns `None` when the value is not a parseable media type.
#[must_use]
pub fn normalize_content_type(value: &str) -> Option<String> {
    value
        .trim()
        .parse::<Mime>()
        .ok()
        .map(|mime| mime.essence_str().to_ascii_lowercase())
}

/// Infers a content type from the leading bytes of an object.
///
/// Metadata set by the uploader is never trusted on its own; the processor
/// compares it against this signature check.
#[must_use]
pub fn sniff_content_type(head: &[u8]) -> Option<&'static str> {
    match head {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'%', b'P', b'D', b'F', b'-', ..] => Some("application/pdf"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}
