//! Raster detection and `data:` URI encoding for inlined images.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use url::Url;

/// MIME type of a raster image payload, by magic bytes first and the
/// declared content type second. SVG is never raster: it can carry script.
pub(crate) fn raster_mime(bytes: &[u8], content_type: Option<&str>) -> Option<String> {
    if let Some(mime) = sniff(bytes) {
        return Some(mime.to_string());
    }
    let declared = content_type?
        .split(';')
        .next()?
        .trim()
        .to_ascii_lowercase();
    if declared.starts_with("image/") && !declared.starts_with("image/svg") && !bytes.is_empty() {
        Some(declared)
    } else {
        None
    }
}

fn sniff(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, ..] => Some("image/png"),
        [0xff, 0xd8, 0xff, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        [0x00, 0x00, 0x01, 0x00, ..] => Some("image/x-icon"),
        _ => None,
    }
}

/// `data:<mime>;base64,<payload>`.
pub(crate) fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Resolve an `<img src>` value to a fetchable URL.
///
/// `None` for values that are already embedded, empty, or cannot be
/// resolved (a relative reference without a base).
pub(crate) fn resolve(src: &str, base: Option<&Url>) -> Option<Url> {
    let src = src.trim();
    if src.is_empty() || src.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")) {
        return None;
    }
    let url = match base {
        Some(base) => base.join(src).ok()?,
        None => Url::parse(src).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then_some(url)
}
