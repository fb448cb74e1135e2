//! Authenticated and public integrity verification.

mod common;

use carimbo::verify::{MSG_AUTHENTIC, MSG_MODIFIED, MSG_SIMPLE, MSG_VALID};
use carimbo::{ArtifactId, Error, SignatureKind};

use common::TestEngine;

fn signed_document(
    artifact: ArtifactId,
) -> (TestEngine, common::MemStore, String) {
    let (mut engine, store, mailer, _) = common::engine();
    engine
        .compose_and_store(artifact, "<p>Documento verificável.</p>")
        .expect("compose fixture document");
    let signer = common::signer(5, "Carla Nunes");
    engine
        .request_advanced_signing_code(artifact, &signer, "senha123", "Documento")
        .expect("request code");
    let code = mailer.last_code().expect("mailed code");
    let record = engine
        .confirm_advanced_signature(artifact, &signer, &code, None)
        .expect("confirm signature");
    (engine, store, record.verification_code)
}

#[test]
fn test_verify_untouched_document_is_valid() {
    let artifact = ArtifactId::document(1);
    let (engine, _, _) = signed_document(artifact);

    let reports = engine.verify_signatures(artifact).unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].valid);
    assert_eq!(reports[0].kind, SignatureKind::Advanced);
    assert_eq!(reports[0].message, MSG_VALID);
}

#[test]
fn test_verify_detects_tampering() {
    let artifact = ArtifactId::document(1);
    let (engine, store, _) = signed_document(artifact);

    let mut bytes = store.bytes(artifact);
    bytes.push(b' ');
    store.insert(artifact, bytes);

    let reports = engine.verify_signatures(artifact).unwrap();
    assert!(!reports[0].valid);
    assert_eq!(reports[0].message, MSG_MODIFIED);
}

#[test]
fn test_verify_simple_signature_not_applicable() {
    let artifact = ArtifactId::document(2);
    let (mut engine, _, _, _) = common::engine();
    engine.compose_and_store(artifact, "<p>Documento simples.</p>").unwrap();
    let signer = common::signer(3, "Davi Prado");
    engine.record_simple_signature(artifact, &signer, "senha123").unwrap();

    let reports = engine.verify_signatures(artifact).unwrap();
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].valid);
    assert_eq!(reports[0].message, MSG_SIMPLE);
}

#[test]
fn test_public_upload_matches_stored_bytes() {
    let artifact = ArtifactId::document(1);
    let (engine, store, code) = signed_document(artifact);

    let reports = engine.verify_by_upload(&store.bytes(artifact), &code).unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].valid);
    assert_eq!(reports[0].message, MSG_AUTHENTIC);
    assert_eq!(reports[0].signer_name, "Carla Nunes");
}

#[test]
fn test_public_upload_with_altered_bytes_yields_empty_list() {
    let artifact = ArtifactId::document(1);
    let (engine, store, code) = signed_document(artifact);

    let mut altered = store.bytes(artifact);
    altered[10] ^= 0x01;
    let reports = engine.verify_by_upload(&altered, &code).unwrap();
    assert!(reports.is_empty());
}

#[test]
fn test_public_upload_unknown_code() {
    let artifact = ArtifactId::document(1);
    let (engine, store, _) = signed_document(artifact);

    let err = engine
        .verify_by_upload(&store.bytes(artifact), "0000-inexistente")
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_public_upload_empty_file() {
    let artifact = ArtifactId::document(1);
    let (engine, _, code) = signed_document(artifact);

    let err = engine.verify_by_upload(&[], &code).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn test_reports_serialize_for_an_http_layer() {
    let artifact = ArtifactId::document(1);
    let (engine, _, _) = signed_document(artifact);

    let reports = engine.verify_signatures(artifact).unwrap();
    let json = serde_json::to_string(&reports).unwrap();
    assert!(json.contains("\"signer_name\":\"Carla Nunes\""));
    assert!(json.contains("Documento íntegro e válido."));
}

#[test]
fn test_public_verification_covers_institutional_family() {
    let artifact = ArtifactId::institutional(40);
    let (mut engine, store, mailer, _) = common::engine();
    engine.compose_and_store(artifact, "<p>Portaria nº 40.</p>").unwrap();
    let signer = common::signer(9, "Elisa Castro");
    engine
        .request_advanced_signing_code(artifact, &signer, "senha123", "Portaria 40")
        .unwrap();
    let code = mailer.last_code().unwrap();
    let record = engine.confirm_advanced_signature(artifact, &signer, &code, None).unwrap();

    let reports = engine
        .verify_by_upload(&store.bytes(artifact), &record.verification_code)
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].message, MSG_AUTHENTIC);

    // Families keep separate ledgers.
    assert!(engine.signatures(ArtifactId::document(40)).is_empty());
}
