//! Institutional letterhead template.
//!
//! The template is a normal PDF whose first page carries the institution's
//! header and footer art. It is loaded once, converted to a Form XObject, and
//! replayed as the underlay of every composed and stamp page. The band
//! constants describe the region the artwork occupies, so layout code knows
//! where body text may go.

use crate::error::{Error, Result};
use crate::pdf::{ContentStreamBuilder, Object, Page, PdfFile};

/// Height of the header artwork band, in points.
pub const HEADER_BAND: f32 = 102.0;
/// Height of the footer artwork band, in points.
pub const FOOTER_BAND: f32 = 80.0;
/// Left and right text margin, in points.
pub const MARGIN_H: f32 = 50.0;
/// Gap between the header band and the first text line, in points.
pub const MARGIN_TOP: f32 = 15.0;
/// Baseline-to-baseline distance for stamp text, in points.
pub const LINE_SPACING: f32 = 12.0;

/// Resource name the template form is registered under.
const TEMPLATE_FORM: &str = "Cf0";

/// A loaded letterhead, ready to underlay pages.
#[derive(Debug, Clone)]
pub struct Letterhead {
    width: f32,
    height: f32,
    form: Object,
}

impl Letterhead {
    /// Load a template PDF and capture its first page as the underlay form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = PdfFile::load(bytes)
            .map_err(|e| Error::MalformedTemplate(format!("template load: {}", e)))?;
        let first = doc
            .pages
            .first()
            .ok_or_else(|| Error::MalformedTemplate("template has no pages".into()))?;
        log::debug!(
            "letterhead loaded: {}x{} pt, {} template page(s)",
            first.width(),
            first.height(),
            doc.page_count()
        );
        Ok(Self {
            width: first.width(),
            height: first.height(),
            form: first.as_form_xobject(),
        })
    }

    /// Page width in points.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Page height in points.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Topmost usable baseline for body text.
    pub fn body_top(&self) -> f32 {
        self.height - HEADER_BAND - MARGIN_TOP
    }

    /// Lowest usable baseline for body text.
    pub fn body_bottom(&self) -> f32 {
        FOOTER_BAND
    }

    /// Usable text width between the horizontal margins.
    pub fn body_width(&self) -> f32 {
        self.width - 2.0 * MARGIN_H
    }

    /// A fresh page with the letterhead drawn as its first content.
    pub fn new_page(&self) -> Page {
        let mut page = Page::new(self.width, self.height);
        page.add_xobject(TEMPLATE_FORM, self.form.clone());
        let mut ops = ContentStreamBuilder::new();
        ops.save_state();
        ops.draw_form(TEMPLATE_FORM);
        ops.restore_state();
        page.append_content(&ops.build());
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{ContentStreamBuilder, Page, PdfFile};

    fn template_bytes() -> Vec<u8> {
        let mut page = Page::new(595.0, 842.0);
        page.add_base_font("Fh", "Helvetica");
        let mut ops = ContentStreamBuilder::new();
        ops.show_text_line("Fh", 14.0, 200.0, 800.0, "Instituição Exemplo");
        page.append_content(&ops.build());
        let mut doc = PdfFile::new();
        doc.add_page(page);
        doc.save().unwrap()
    }

    #[test]
    fn test_from_bytes_captures_geometry() {
        let lh = Letterhead::from_bytes(&template_bytes()).unwrap();
        assert_eq!(lh.width(), 595.0);
        assert_eq!(lh.height(), 842.0);
        assert_eq!(lh.body_top(), 842.0 - HEADER_BAND - MARGIN_TOP);
        assert_eq!(lh.body_bottom(), FOOTER_BAND);
        assert_eq!(lh.body_width(), 595.0 - 2.0 * MARGIN_H);
    }

    #[test]
    fn test_new_page_carries_template() {
        let lh = Letterhead::from_bytes(&template_bytes()).unwrap();
        let page = lh.new_page();
        assert!(page.extract_text().contains("Instituição Exemplo"));
        assert!(page.content.windows(7).any(|w| w == b"/Cf0 Do"));
    }

    #[test]
    fn test_garbage_template_rejected() {
        let err = Letterhead::from_bytes(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, Error::MalformedTemplate(_)));
    }
}
