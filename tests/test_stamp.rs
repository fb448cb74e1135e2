//! Stamp rendering over real composed documents.

mod common;

use chrono::{TimeZone, Utc};

use carimbo::compose::compose;
use carimbo::ledger::{ArtifactId, SignatureKind, SignatureRecord};
use carimbo::letterhead::Letterhead;
use carimbo::pdf::{Object, PdfFile};
use carimbo::stamp::{apply_stamps, strip_stamp_pages, ADVANCED_MARKER, SIMPLE_MARKER};

use common::letterhead_bytes;

const URL: &str = "http://localhost:5173/verificacao";

fn letterhead() -> Letterhead {
    Letterhead::from_bytes(&letterhead_bytes()).expect("fixture letterhead")
}

fn composed(lh: &Letterhead) -> Vec<u8> {
    compose(lh, "<p>Corpo do documento.</p>").unwrap().save().unwrap()
}

fn record(signer: u64, name: &str, kind: SignatureKind) -> SignatureRecord {
    let signed_at = Utc.with_ymd_and_hms(2025, 3, 9, 14, 30, 0).unwrap();
    SignatureRecord::new(ArtifactId::document(1), signer, name, kind, signed_at)
}

#[test]
fn test_stamp_page_keeps_body_intact() {
    common::init_logging();
    let lh = letterhead();
    let records = vec![record(1, "Maria Souza", SignatureKind::Advanced)];
    let stamped = apply_stamps(&lh, &composed(&lh), &records, URL).unwrap();

    let doc = PdfFile::load(&stamped).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert!(doc.pages[0].extract_text().contains("Corpo do documento."));
    assert!(!doc.pages[0].extract_text().contains(ADVANCED_MARKER));
    assert!(doc.pages[1].extract_text().contains(ADVANCED_MARKER));
}

#[test]
fn test_mixed_kinds_stamp_in_record_order() {
    let lh = letterhead();
    let records = vec![
        record(1, "Maria Souza", SignatureKind::Simple),
        record(2, "João Pereira", SignatureKind::Advanced),
    ];
    let stamped = apply_stamps(&lh, &composed(&lh), &records, URL).unwrap();
    let text = PdfFile::load(&stamped).unwrap().pages[1].extract_text();

    let simple_at = text.find(SIMPLE_MARKER).expect("simple block");
    let advanced_at = text.find(ADVANCED_MARKER).expect("advanced block");
    assert!(simple_at < advanced_at);
    assert!(text.contains("Assinado por: Maria Souza em 09/03/2025 14:30:00"));
    assert!(text.contains("Por: João Pereira em 09/03/2025 14:30:00"));
}

#[test]
fn test_stamp_page_embeds_qr_image() {
    let lh = letterhead();
    let records = vec![record(1, "Maria Souza", SignatureKind::Advanced)];
    let stamped = apply_stamps(&lh, &composed(&lh), &records, URL).unwrap();

    let doc = PdfFile::load(&stamped).unwrap();
    let resources = doc.pages[1].resources.as_dict().expect("resources");
    let xobjects = resources.get("XObject").and_then(Object::as_dict).expect("xobjects");
    let has_image = xobjects.values().any(|x| {
        x.as_dict()
            .and_then(|d| d.get("Subtype"))
            .and_then(Object::as_name)
            == Some("Image")
    });
    assert!(has_image, "stamp page should carry the QR image XObject");
}

#[test]
fn test_restamp_is_idempotent_bytewise() {
    let lh = letterhead();
    let records = vec![
        record(1, "Maria Souza", SignatureKind::Simple),
        record(2, "João Pereira", SignatureKind::Advanced),
        record(3, "Carla Nunes", SignatureKind::Advanced),
    ];
    let once = apply_stamps(&lh, &composed(&lh), &records, URL).unwrap();
    let twice = apply_stamps(&lh, &once, &records, URL).unwrap();
    let thrice = apply_stamps(&lh, &twice, &records, URL).unwrap();
    assert_eq!(once, twice);
    assert_eq!(twice, thrice);
}

#[test]
fn test_strip_then_restamp_reflects_record_removal() {
    let lh = letterhead();
    let full = vec![
        record(1, "Maria Souza", SignatureKind::Simple),
        record(2, "João Pereira", SignatureKind::Advanced),
    ];
    let stamped = apply_stamps(&lh, &composed(&lh), &full, URL).unwrap();

    let remaining = vec![full[1].clone()];
    let restamped = apply_stamps(&lh, &stamped, &remaining, URL).unwrap();
    let text = PdfFile::load(&restamped).unwrap().pages[1].extract_text();
    assert!(!text.contains(SIMPLE_MARKER));
    assert!(text.contains(ADVANCED_MARKER));
}

#[test]
fn test_stamped_file_survives_disk_round_trip() {
    let lh = letterhead();
    let records = vec![record(1, "Maria Souza", SignatureKind::Advanced)];
    let stamped = apply_stamps(&lh, &composed(&lh), &records, URL).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assinado.pdf");
    std::fs::write(&path, &stamped).unwrap();
    let read_back = std::fs::read(&path).unwrap();

    assert_eq!(read_back, stamped);
    let doc = PdfFile::load(&read_back).unwrap();
    assert!(doc.pages[1].extract_text().contains(ADVANCED_MARKER));
}

#[test]
fn test_strip_only_removes_marker_pages() {
    let lh = letterhead();
    let records = vec![record(1, "Maria Souza", SignatureKind::Advanced)];
    let stamped = apply_stamps(&lh, &composed(&lh), &records, URL).unwrap();

    let mut doc = PdfFile::load(&stamped).unwrap();
    assert_eq!(strip_stamp_pages(&mut doc), 1);
    assert_eq!(doc.page_count(), 1);
    assert!(doc.pages[0].extract_text().contains("Corpo do documento."));
}
