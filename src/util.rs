//! Input decoding helpers.

use std::borrow::Cow;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<meta charset>`)
/// 3. Falls back to Windows-1252 (superset of ISO-8859-1)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Find the label of a `charset=` declaration near the start of an HTML
/// document (`<meta charset="...">` or the `http-equiv` content form).
pub fn extract_meta_charset(bytes: &[u8]) -> Option<&str> {
    // Browsers only prescan the first 1024 bytes
    let check_len = bytes.len().min(1024);
    let prefix = &bytes[..check_len];

    let pos = prefix
        .windows(8)
        .position(|w| w.eq_ignore_ascii_case(b"charset="))?;
    let mut value = &prefix[pos + 8..];

    if let Some((&quote, rest)) = value.split_first()
        && (quote == b'"' || quote == b'\'')
    {
        value = rest;
    }

    let end = value
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'>' | b'/') || b.is_ascii_whitespace())
        .unwrap_or(value.len());

    if end == 0 {
        return None;
    }
    std::str::from_utf8(&value[..end]).ok()
}
