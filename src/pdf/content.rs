//! PDF content stream building and string scanning.
//!
//! The builder covers exactly the operator subset the composer and stamp
//! renderer emit: graphics-state save/restore, translation, form and image
//! painting, and single-line text runs with the standard 14 fonts. Text is
//! WinAnsi-encoded on the way out.

use super::encoding::{encode_winansi, escape_literal};

/// Render a number the short way: integers without a fraction, reals with
/// up to four digits and no trailing zeros.
pub(crate) fn fmt_number(value: f32) -> String {
    if (value - value.round()).abs() < 1e-4 {
        format!("{}", value.round() as i64)
    } else {
        let mut s = format!("{:.4}", value);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

/// Incremental builder for a page or form content stream.
#[derive(Debug, Default)]
pub struct ContentStreamBuilder {
    buf: Vec<u8>,
}

impl ContentStreamBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push_line(&mut self, line: &str) -> &mut Self {
        self.buf.extend_from_slice(line.as_bytes());
        self.buf.push(b'\n');
        self
    }

    /// Save graphics state (`q`).
    pub fn save_state(&mut self) -> &mut Self {
        self.push_line("q")
    }

    /// Restore graphics state (`Q`).
    pub fn restore_state(&mut self) -> &mut Self {
        self.push_line("Q")
    }

    /// Translate the coordinate system (`cm`).
    pub fn translate(&mut self, tx: f32, ty: f32) -> &mut Self {
        self.push_line(&format!("1 0 0 1 {} {} cm", fmt_number(tx), fmt_number(ty)))
    }

    /// Paint a named form XObject (`Do`).
    pub fn draw_form(&mut self, resource_name: &str) -> &mut Self {
        self.push_line(&format!("/{} Do", resource_name))
    }

    /// Paint a named image XObject scaled to `width`×`height` at `(x, y)`.
    pub fn draw_image(&mut self, resource_name: &str, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.save_state();
        self.push_line(&format!(
            "{} 0 0 {} {} {} cm",
            fmt_number(width),
            fmt_number(height),
            fmt_number(x),
            fmt_number(y)
        ));
        self.draw_form(resource_name);
        self.restore_state()
    }

    /// Show one line of text at `(x, y)` with the given font resource.
    pub fn show_text_line(&mut self, font_resource: &str, size: f32, x: f32, y: f32, text: &str) -> &mut Self {
        self.push_line("BT");
        self.push_line(&format!("/{} {} Tf", font_resource, fmt_number(size)));
        self.push_line(&format!("{} {} Td", fmt_number(x), fmt_number(y)));
        self.buf.push(b'(');
        self.buf.extend_from_slice(&escape_literal(&encode_winansi(text)));
        self.buf.extend_from_slice(b") Tj\n");
        self.push_line("ET")
    }

    /// Whether anything has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish and return the operator bytes.
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

/// Collect every literal string in a content stream, unescaped but still
/// encoded. Used for marker detection on stamp pages; hex strings and
/// comments are skipped.
pub fn literal_strings(content: &[u8]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < content.len() {
        match content[pos] {
            b'%' => {
                while pos < content.len() && content[pos] != b'\n' && content[pos] != b'\r' {
                    pos += 1;
                }
            }
            b'<' => {
                if content.get(pos + 1) == Some(&b'<') {
                    pos += 2;
                } else {
                    pos += 1;
                    while pos < content.len() && content[pos] != b'>' {
                        pos += 1;
                    }
                    pos += 1;
                }
            }
            b'(' => {
                pos += 1;
                let mut string = Vec::new();
                let mut depth = 1usize;
                while pos < content.len() {
                    let b = content[pos];
                    pos += 1;
                    match b {
                        b'\\' => {
                            if pos >= content.len() {
                                break;
                            }
                            let esc = content[pos];
                            pos += 1;
                            match esc {
                                b'n' => string.push(b'\n'),
                                b'r' => string.push(b'\r'),
                                b't' => string.push(b'\t'),
                                b'b' => string.push(0x08),
                                b'f' => string.push(0x0C),
                                b'(' | b')' | b'\\' => string.push(esc),
                                b'\n' => {}
                                b'\r' => {
                                    if content.get(pos) == Some(&b'\n') {
                                        pos += 1;
                                    }
                                }
                                b'0'..=b'7' => {
                                    let mut value = (esc - b'0') as u32;
                                    for _ in 0..2 {
                                        match content.get(pos) {
                                            Some(d @ b'0'..=b'7') => {
                                                value = value * 8 + (d - b'0') as u32;
                                                pos += 1;
                                            }
                                            _ => break,
                                        }
                                    }
                                    string.push((value & 0xFF) as u8);
                                }
                                other => string.push(other),
                            }
                        }
                        b'(' => {
                            depth += 1;
                            string.push(b'(');
                        }
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            string.push(b')');
                        }
                        other => string.push(other),
                    }
                }
                out.push(string);
            }
            _ => pos += 1,
        }
    }
    out
}
