pub(super) fn is_quote(b: u8) -> bool {
    matches!(b, b'`' | b'\'' | b'"')
}

/// Index of the quote closing the literal opened at `start`, if the literal is terminated.
pub(super) fn closing_quote(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    bytes[start + 1..]
        .iter()
        .position(|&b| b == quote)
        .map(|offset| start + 1 + offset)
}

/// Scan a parameter name starting at `start` (just past the `@`): a letter followed by
/// letters, digits or underscores. Returns the end index and the name.
pub(super) fn scan_name(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    if !bytes.get(start).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    let mut idx = start + 1;
    while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_') {
        idx += 1;
    }
    std::str::from_utf8(&bytes[start..idx])
        .ok()
        .map(|name| (idx, name))
}
