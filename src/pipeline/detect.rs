//! Binary-content probe.
//!
//! A file is text only if every check passes. The cheap checks look at the
//! first [`PROBE_LEN`] bytes and run before the size gate, so a large image
//! is reported as binary rather than oversize. The full decode runs only on
//! files that are within the size limit.
//!
//! ## Checks
//!
//! 1. Known binary magic prefixes (PDF, PNG, JPEG, GIF, ZIP, ELF, gzip)
//! 2. A NUL byte
//! 3. More than 30% control bytes that never occur in text
//! 4. The whole file must be valid UTF-8

/// Number of leading bytes inspected by [`looks_binary`].
pub const PROBE_LEN: usize = 8 * 1024;

const MAGIC_PREFIXES: &[&[u8]] = &[
    b"%PDF-",
    b"\x89PNG\r\n\x1a\n",
    b"\xFF\xD8\xFF",
    b"GIF87a",
    b"GIF89a",
    b"PK\x03\x04",
    b"\x7FELF",
    b"\x1F\x8B",
];

/// Percentage of suspicious control bytes above which a prefix is binary.
const CONTROL_RATIO_PERCENT: usize = 30;

/// Control bytes that legitimately appear in text files, including the
/// terminal artefacts the cleanup pipeline knows how to remove.
fn is_text_control(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\r' | 0x08 | 0x0C | 0x1B)
}

/// `true` when the leading bytes of a file prove it is not text.
pub fn looks_binary(prefix: &[u8]) -> bool {
    let prefix = &prefix[..prefix.len().min(PROBE_LEN)];
    if prefix.is_empty() {
        return false;
    }
    if MAGIC_PREFIXES.iter().any(|m| prefix.starts_with(m)) {
        return true;
    }
    if prefix.contains(&0) {
        return true;
    }
    let suspicious = prefix
        .iter()
        .filter(|&&b| (b < 0x20 && !is_text_control(b)) || b == 0x7F)
        .count();
    suspicious * 100 > prefix.len() * CONTROL_RATIO_PERCENT
}

/// Decode a whole file as text, or `None` when it is binary after all.
pub fn decode_text(bytes: Vec<u8>) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_binary() {
        assert!(!looks_binary(b"hello\tworld\r\n"));
        assert!(!looks_binary("caf\u{00E9} \u{201C}q\u{201D}".as_bytes()));
        assert!(!looks_binary(b""));
    }

    #[test]
    fn terminal_logs_are_text() {
        assert!(!looks_binary(b"\x1b[31mred\x1b[0m b\x08bold"));
    }

    #[test]
    fn nul_byte_is_binary() {
        assert!(looks_binary(b"abc\0def"));
        assert_eq!(decode_text(b"abc\0def".to_vec()), None);
    }

    #[test]
    fn magic_prefixes_are_binary() {
        assert!(looks_binary(b"%PDF-1.7\n%text-looking"));
        assert!(looks_binary(b"\x89PNG\r\n\x1a\nrest"));
        assert!(looks_binary(b"\x7FELF\x02\x01"));
        assert!(looks_binary(b"PK\x03\x04zip"));
    }

    #[test]
    fn control_heavy_prefix_is_binary() {
        let mut data = vec![0x01u8; 40];
        data.extend_from_slice(&[b'a'; 60]);
        assert!(looks_binary(&data));

        let mut data = vec![0x01u8; 20];
        data.extend_from_slice(&[b'a'; 80]);
        assert!(!looks_binary(&data));
    }

    #[test]
    fn invalid_utf8_fails_decode() {
        assert_eq!(decode_text(vec![b'a', 0xC3, 0x28]), None);
        assert_eq!(decode_text(b"ok".to_vec()).as_deref(), Some("ok"));
    }
}
