//! Reversible mapping between store keys and file names
//!
//! Keys such as `tasks:01HZX...` contain characters that are not portable in
//! file names. ASCII alphanumerics, `-` and `_` pass through; every other byte
//! is written as `%XX`.

/// Encode a store key as a file name stem
pub fn key_to_filename(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Decode a file name stem produced by [`key_to_filename`]
///
/// Returns `None` for stems that are not valid encodings.
pub fn key_from_filename(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_keys_unchanged() {
        assert_eq!(key_to_filename("boards"), "boards");
        assert_eq!(key_to_filename("recurring_tasks"), "recurring_tasks");
        assert_eq!(key_to_filename("01HZX-abc"), "01HZX-abc");
    }

    #[test]
    fn test_namespace_key_escaped() {
        let encoded = key_to_filename("tasks:01HZX");
        assert_eq!(encoded, "tasks%3A01HZX");
        assert_eq!(key_from_filename(&encoded).as_deref(), Some("tasks:01HZX"));
    }

    #[test]
    fn test_path_separators_escaped() {
        let encoded = key_to_filename("../etc/passwd");
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('.'));
        assert_eq!(key_from_filename(&encoded).as_deref(), Some("../etc/passwd"));
    }

    #[test]
    fn test_invalid_encoding() {
        assert_eq!(key_from_filename("bad%Z1"), None);
        assert_eq!(key_from_filename("trailing%4"), None);
    }
}
