//! Visual signature stamps.
//!
//! Stamps live on dedicated letterheaded pages appended after the document
//! body. Re-stamping first strips every existing stamp page (recognized by
//! the marker strings) and renders the full ledger again, so the stamp pages
//! are always a pure function of the record list.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::ledger::{SignatureKind, SignatureRecord};
use crate::letterhead::{Letterhead, FOOTER_BAND, LINE_SPACING, MARGIN_H};
use crate::pdf::{image_xobject_from_png, ContentStreamBuilder, Page, PdfFile};
use crate::qr::qr_png;

/// First line of every advanced stamp block; also the page-strip marker.
pub const ADVANCED_MARKER: &str = "Assinado eletronicamente de forma avançada";
/// First line of every simple stamp block; also the page-strip marker.
pub const SIMPLE_MARKER: &str = "Assinatura Eletrônica de forma simples";

const LABEL_FONT: &str = "Fhb";
const LABEL_SIZE: f32 = 12.0;
const TEXT_FONT: &str = "Fh";
const TEXT_SIZE: f32 = 11.0;
const QR_SIDE: f32 = 120.0;
const QR_RESOURCE: &str = "Iqr";

/// Remove every page whose text contains a stamp marker. Returns how many
/// pages were dropped.
pub fn strip_stamp_pages(doc: &mut PdfFile) -> usize {
    let before = doc.page_count();
    doc.pages.retain(|page| {
        let text = page.extract_text();
        !text.contains(ADVANCED_MARKER) && !text.contains(SIMPLE_MARKER)
    });
    before - doc.page_count()
}

/// Format a signing instant the way the stamp shows it.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format("%d/%m/%Y %H:%M:%S").to_string()
}

/// Strip old stamp pages and render one block per record, followed by a
/// single QR code pointing at `verification_url`. An empty record list
/// returns the input unchanged.
pub fn apply_stamps(
    letterhead: &Letterhead,
    pdf_bytes: &[u8],
    records: &[SignatureRecord],
    verification_url: &str,
) -> Result<Vec<u8>> {
    if records.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let mut doc = PdfFile::load(pdf_bytes)?;
    let stripped = strip_stamp_pages(&mut doc);
    log::info!(
        "stamping: {} record(s), {} old stamp page(s) stripped",
        records.len(),
        stripped
    );

    let mut canvas = Canvas::fresh(letterhead);
    for record in records {
        let required = match record.kind {
            SignatureKind::Advanced => 4.0 * LINE_SPACING,
            SignatureKind::Simple => 3.0 * LINE_SPACING,
        };
        if canvas.y - required < FOOTER_BAND {
            canvas = canvas.flush(letterhead, &mut doc);
        }
        match record.kind {
            SignatureKind::Advanced => {
                canvas.text_line(LABEL_FONT, LABEL_SIZE, ADVANCED_MARKER);
                canvas.text_line(
                    TEXT_FONT,
                    TEXT_SIZE,
                    &format!("Por: {} em {}", record.signer_name, format_timestamp(&record.signed_at)),
                );
                canvas.text_line(
                    TEXT_FONT,
                    TEXT_SIZE,
                    &format!("Código de Verificação: {}", record.verification_code),
                );
                // The third line keeps its baseline; only the block gap follows.
                canvas.y += LINE_SPACING;
            }
            SignatureKind::Simple => {
                canvas.text_line(LABEL_FONT, LABEL_SIZE, SIMPLE_MARKER);
                canvas.text_line(
                    TEXT_FONT,
                    TEXT_SIZE,
                    &format!(
                        "Assinado por: {} em {} | Código: {}",
                        record.signer_name,
                        format_timestamp(&record.signed_at),
                        record.verification_code
                    ),
                );
                canvas.y += LINE_SPACING;
            }
        }
        canvas.y -= 2.0 * LINE_SPACING;
    }

    canvas.y -= QR_SIDE;
    if canvas.y < FOOTER_BAND {
        canvas = canvas.flush(letterhead, &mut doc);
        canvas.y -= QR_SIDE;
    }
    let qr = image_xobject_from_png(&qr_png(verification_url)?)?;
    canvas.page.add_xobject(QR_RESOURCE, qr);
    let x = (letterhead.width() - QR_SIDE) / 2.0;
    canvas.ops.draw_image(QR_RESOURCE, x, canvas.y, QR_SIDE, QR_SIDE);

    canvas.finish(&mut doc);
    doc.save()
}

/// One stamp page under construction, with the running baseline.
struct Canvas {
    page: Page,
    ops: ContentStreamBuilder,
    y: f32,
}

impl Canvas {
    fn fresh(letterhead: &Letterhead) -> Self {
        let mut page = letterhead.new_page();
        page.add_base_font(LABEL_FONT, "Helvetica-Bold");
        page.add_base_font(TEXT_FONT, "Helvetica");
        Self { page, ops: ContentStreamBuilder::new(), y: letterhead.body_top() }
    }

    /// Commit the current page to `doc` and start the next one.
    fn flush(self, letterhead: &Letterhead, doc: &mut PdfFile) -> Self {
        self.finish(doc);
        Self::fresh(letterhead)
    }

    fn finish(mut self, doc: &mut PdfFile) {
        self.page.append_content(&self.ops.build());
        doc.add_page(self.page);
    }

    fn text_line(&mut self, font: &str, size: f32, text: &str) {
        self.ops.show_text_line(font, size, MARGIN_H, self.y, text);
        self.y -= LINE_SPACING;
    }
}
