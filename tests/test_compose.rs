//! Document composition: rich text onto the letterhead.

mod common;

use carimbo::letterhead::{Letterhead, FOOTER_BAND, MARGIN_H};
use carimbo::compose::compose;
use carimbo::pdf::PdfFile;
use carimbo::ArtifactId;

use common::letterhead_bytes;

fn letterhead() -> Letterhead {
    Letterhead::from_bytes(&letterhead_bytes()).expect("fixture letterhead")
}

/// The x coordinate of the text line showing `needle`, from the Td operator.
fn line_x(content: &[u8], needle: &str) -> Option<f32> {
    let text = String::from_utf8_lossy(content);
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if line.contains(needle) && line.ends_with("Tj") {
            let td = lines[i.checked_sub(1)?]; // "x y Td"
            return td.split_whitespace().next()?.parse().ok();
        }
    }
    None
}

#[test]
fn test_single_page_document_carries_template_and_text() {
    common::init_logging();
    let doc = compose(&letterhead(), "<p>Ata da primeira reunião ordinária.</p>").unwrap();
    assert_eq!(doc.page_count(), 1);
    let text = doc.pages[0].extract_text();
    assert!(text.contains("Associação Exemplo de Ensino"));
    assert!(text.contains("Ata da primeira reunião ordinária."));
}

#[test]
fn test_long_content_flows_onto_letterheaded_pages() {
    let paragraph = "<p>Parágrafo de teste com texto suficiente para ocupar espaço.</p>";
    let html = paragraph.repeat(60);
    let doc = compose(&letterhead(), &html).unwrap();
    assert!(doc.page_count() > 1);
    for page in &doc.pages {
        assert!(page.extract_text().contains("Associação Exemplo de Ensino"));
    }
}

#[test]
fn test_alignment_moves_lines() {
    let lh = letterhead();
    let html = "<p>esquerda</p>\
                <p class=\"ql-align-center\">centro</p>\
                <p class=\"ql-align-right\">fim</p>";
    let doc = compose(&lh, html).unwrap();
    let content = &doc.pages[0].content;

    let left = line_x(content, "(esquerda)").expect("left line");
    let center = line_x(content, "(centro)").expect("centered line");
    let right = line_x(content, "(fim)").expect("right line");

    assert_eq!(left, MARGIN_H);
    assert!(center > MARGIN_H);
    assert!(right > center);
    assert!(right < lh.width() - MARGIN_H);
}

#[test]
fn test_text_stays_above_footer_band() {
    let html = "<p>linha</p>".repeat(200);
    let doc = compose(&letterhead(), &html).unwrap();
    for page in &doc.pages {
        let text = String::from_utf8_lossy(&page.content);
        for (i, line) in text.lines().enumerate() {
            if line.ends_with("Td") {
                let y: f32 = line
                    .split_whitespace()
                    .nth(1)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(|| panic!("bad Td at line {}", i));
                assert!(y >= FOOTER_BAND, "baseline {} under the footer band", y);
            }
        }
    }
}

#[test]
fn test_compose_output_round_trips() {
    let doc = compose(&letterhead(), "<p>conteúdo persistível</p>").unwrap();
    let bytes = doc.save().unwrap();
    let reloaded = PdfFile::load(&bytes).unwrap();
    assert_eq!(reloaded.page_count(), doc.page_count());
    assert!(reloaded.pages[0].extract_text().contains("conteúdo persistível"));
}

#[test]
fn test_engine_compose_and_store() {
    let (mut engine, store, _, _) = common::engine();
    let artifact = ArtifactId::document(1);
    let bytes = engine.compose_and_store(artifact, "<p>documento armazenado</p>").unwrap();
    assert_eq!(store.bytes(artifact), bytes);
    assert!(PdfFile::load(&bytes).unwrap().pages[0]
        .extract_text()
        .contains("documento armazenado"));
}
