//! WinAnsi (CP1252) text encoding and literal-string escaping.
//!
//! Stamp text is written with the standard 14 fonts under `/WinAnsiEncoding`,
//! so the Portuguese labels ("avançada", "Eletrônica", "Código") must be
//! encoded to single CP1252 bytes on the way out and decoded back when page
//! text is extracted for marker detection.

/// CP1252 codepoints for the 0x80..0x9F range. `\u{FFFD}` marks the five
/// unassigned slots.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

/// Encode a Rust string to WinAnsi bytes. Characters outside CP1252 become `?`.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let code = ch as u32;
        if code < 0x80 {
            out.push(code as u8);
        } else if (0xA0..=0xFF).contains(&code) {
            // CP1252 matches Latin-1 in this range
            out.push(code as u8);
        } else if let Some(pos) = CP1252_HIGH.iter().position(|&c| c == ch) {
            out.push(0x80 + pos as u8);
        } else {
            out.push(b'?');
        }
    }
    out
}

/// Decode WinAnsi bytes to a Rust string.
pub fn decode_winansi(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            0x00..=0x7F => out.push(b as char),
            0x80..=0x9F => out.push(CP1252_HIGH[(b - 0x80) as usize]),
            0xA0..=0xFF => out.push(char::from_u32(b as u32).unwrap_or('\u{FFFD}')),
        }
    }
    out
}

/// Escape bytes for inclusion in a PDF literal string `( ... )`.
///
/// Backslash, parentheses, and control bytes are escaped; everything else
/// passes through unchanged.
pub fn escape_literal(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 4);
    for &b in bytes {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x00..=0x1F => {
                out.extend_from_slice(format!("\\{:03o}", b).as_bytes());
            }
            _ => out.push(b),
        }
    }
    out
}
