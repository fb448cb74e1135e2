//! Rich-text to letterheaded PDF composition.
//!
//! Input is the Quill-flavoured HTML the document editor produces: one `<p>`
//! per paragraph, alignment expressed as `ql-align-*` classes. The composer
//! normalizes that into aligned plain-text paragraphs, then lays them out in
//! Times-Roman 12 over the letterhead, breaking to a fresh letterheaded page
//! whenever the footer band is reached.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Result;
use crate::letterhead::{Letterhead, MARGIN_H};
use crate::pdf::{ContentStreamBuilder, Page, PdfFile};

/// Body text size in points.
pub const BODY_FONT_SIZE: f32 = 12.0;
/// Body baseline-to-baseline distance in points.
pub const BODY_LEADING: f32 = 14.4;

const BODY_FONT: &str = "Ft0";

/// Paragraph alignment, recovered from the Quill class names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// Default when no class is present.
    Left,
    /// `ql-align-center`.
    Center,
    /// `ql-align-right`.
    Right,
    /// `ql-align-justify`; rendered as left-aligned.
    Justify,
}

/// One normalized paragraph of body text.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    /// Markup-free text content.
    pub text: String,
    /// Layout alignment.
    pub align: Align,
}

lazy_static! {
    static ref RE_PARAGRAPH: Regex = Regex::new(r"(?s)<p([^>]*)>(.*?)</p>").unwrap();
    static ref RE_BR: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref RE_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref RE_ENTITY: Regex = Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
}

/// Normalize rich-text HTML into aligned paragraphs.
///
/// Input without any `<p>` markup is treated as plain text, one paragraph
/// per line.
pub fn parse_rich_text(html: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut matched = false;
    for caps in RE_PARAGRAPH.captures_iter(html) {
        matched = true;
        let align = alignment_from_attrs(&caps[1]);
        let inner = RE_BR.replace_all(&caps[2], "\n");
        for line in inner.split('\n') {
            let text = decode_entities(&RE_TAG.replace_all(line, ""));
            paragraphs.push(Paragraph { text: text.trim().to_string(), align });
        }
    }
    if !matched {
        for line in html.lines() {
            let text = decode_entities(&RE_TAG.replace_all(line, ""));
            paragraphs.push(Paragraph { text: text.trim().to_string(), align: Align::Left });
        }
    }
    paragraphs
}

fn alignment_from_attrs(attrs: &str) -> Align {
    if attrs.contains("ql-align-center") {
        Align::Center
    } else if attrs.contains("ql-align-right") {
        Align::Right
    } else if attrs.contains("ql-align-justify") {
        Align::Justify
    } else {
        Align::Left
    }
}

fn decode_entities(text: &str) -> String {
    RE_ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            if let Some(num) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                return u32::from_str_radix(num, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default();
            }
            if let Some(num) = entity.strip_prefix('#') {
                return num
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default();
            }
            match entity {
                "nbsp" => " ".to_string(),
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                other => format!("&{};", other),
            }
        })
        .into_owned()
}

/// Approximate Times-Roman advance width in 1/1000 em units. Exact metrics
/// are not needed; wrapping only has to stay inside the margins.
fn char_width_milli(c: char) -> f32 {
    match c {
        ' ' => 250.0,
        'i' | 'j' | 'l' | '.' | ',' | ';' | ':' | '\'' | '|' | '!' => 278.0,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 333.0,
        'm' | 'M' | 'W' => 889.0,
        'w' => 722.0,
        'A'..='Z' | 'Ç' | 'Ã' | 'Á' | 'É' | 'Í' | 'Ó' | 'Ú' | 'Ô' | 'Â' | 'Ê' => 667.0,
        '0'..='9' => 500.0,
        _ => 500.0,
    }
}

/// Rendered width of `text` at `size` points.
pub(crate) fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(char_width_milli).sum::<f32>() * size / 1000.0
}

fn wrap(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, size) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Compose rich-text content onto the letterhead. Every page carries the
/// template underlay; text flows between the header and footer bands.
pub fn compose(letterhead: &Letterhead, html: &str) -> Result<PdfFile> {
    let paragraphs = parse_rich_text(html);
    log::info!("composing document: {} paragraph(s)", paragraphs.len());

    let mut doc = PdfFile::new();
    let mut page = body_page(letterhead);
    let mut ops = ContentStreamBuilder::new();
    let mut y = letterhead.body_top();

    for paragraph in &paragraphs {
        if paragraph.text.is_empty() {
            y -= BODY_LEADING;
            continue;
        }
        for line in wrap(&paragraph.text, BODY_FONT_SIZE, letterhead.body_width()) {
            if y < letterhead.body_bottom() {
                page.append_content(&ops.build());
                doc.add_page(page);
                page = body_page(letterhead);
                ops = ContentStreamBuilder::new();
                y = letterhead.body_top();
            }
            let x = line_x(letterhead, &line, paragraph.align);
            ops.show_text_line(BODY_FONT, BODY_FONT_SIZE, x, y, &line);
            y -= BODY_LEADING;
        }
    }

    page.append_content(&ops.build());
    doc.add_page(page);
    Ok(doc)
}

fn body_page(letterhead: &Letterhead) -> Page {
    let mut page = letterhead.new_page();
    page.add_base_font(BODY_FONT, "Times-Roman");
    page
}

fn line_x(letterhead: &Letterhead, line: &str, align: Align) -> f32 {
    let width = text_width(line, BODY_FONT_SIZE);
    match align {
        Align::Left | Align::Justify => MARGIN_H,
        Align::Center => MARGIN_H + (letterhead.body_width() - width) / 2.0,
        Align::Right => MARGIN_H + letterhead.body_width() - width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_alignment_classes() {
        let html = "<p>esquerda</p>\
                    <p class=\"ql-align-center\">centro</p>\
                    <p class=\"ql-align-right\">direita</p>\
                    <p class=\"ql-align-justify\">justificado</p>";
        let paragraphs = parse_rich_text(html);
        assert_eq!(paragraphs.len(), 4);
        assert_eq!(paragraphs[0].align, Align::Left);
        assert_eq!(paragraphs[1].align, Align::Center);
        assert_eq!(paragraphs[2].align, Align::Right);
        assert_eq!(paragraphs[3].align, Align::Justify);
        assert_eq!(paragraphs[1].text, "centro");
    }

    #[test]
    fn test_parse_strips_inline_markup_and_entities() {
        let paragraphs = parse_rich_text("<p><strong>Ata&nbsp;&amp;&nbsp;Anexos</strong></p>");
        assert_eq!(paragraphs[0].text, "Ata & Anexos");
    }

    #[test]
    fn test_parse_numeric_entities() {
        let paragraphs = parse_rich_text("<p>cora&#231;&#xE3;o</p>");
        assert_eq!(paragraphs[0].text, "coração");
    }

    #[test]
    fn test_parse_br_splits_lines() {
        let paragraphs = parse_rich_text("<p>linha um<br>linha dois</p>");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[1].text, "linha dois");
    }

    #[test]
    fn test_plain_text_fallback() {
        let paragraphs = parse_rich_text("sem marcação\nsegunda linha");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].align, Align::Left);
    }

    #[test]
    fn test_wrap_respects_max_width() {
        let text = "palavra ".repeat(40);
        for line in wrap(&text, 12.0, 200.0) {
            assert!(text_width(&line, 12.0) <= 200.0);
        }
    }

    #[test]
    fn test_wrap_places_oversized_word_alone() {
        let lines = wrap("curta palavraabsurdamentelongademais curta", 12.0, 60.0);
        assert!(lines.iter().any(|l| l == "palavraabsurdamentelongademais"));
    }
}
