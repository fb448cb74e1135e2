//! Integrity verification reports.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ledger::{SignatureKind, SignatureRecord};

/// Advanced signature whose hash matches the current bytes.
pub const MSG_VALID: &str = "Documento íntegro e válido.";
/// Advanced signature whose hash no longer matches.
pub const MSG_MODIFIED: &str = "ATENÇÃO: O documento foi modificado após esta assinatura.";
/// Simple signatures carry no integrity binding.
pub const MSG_SIMPLE: &str =
    "A verificação de integridade não se aplica a assinaturas simples.";
/// Public-upload verdict for a matching signature.
pub const MSG_AUTHENTIC: &str = "Documento autêntico e íntegro.";

/// Per-signature verdict, ready for an HTTP layer to serialize.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    /// Display name of the signer.
    pub signer_name: String,
    /// When the signature was recorded.
    pub signed_at: DateTime<Utc>,
    /// Signature strength.
    pub kind: SignatureKind,
    /// Whether the integrity check passed.
    pub valid: bool,
    /// Human-readable verdict, in Portuguese.
    pub message: String,
}

impl VerificationReport {
    fn from_record(record: &SignatureRecord, valid: bool, message: &str) -> Self {
        Self {
            signer_name: record.signer_name.clone(),
            signed_at: record.signed_at,
            kind: record.kind,
            valid,
            message: message.to_string(),
        }
    }
}

/// Report on every signature of an artifact against its current hash.
///
/// Advanced signatures are valid when their bound hash matches; simple ones
/// are never integrity-valid and say so.
pub fn verify_ledger(records: &[&SignatureRecord], current_hash: &str) -> Vec<VerificationReport> {
    records
        .iter()
        .map(|record| match record.kind {
            SignatureKind::Advanced => {
                let valid = record.content_hash.as_deref() == Some(current_hash);
                let message = if valid { MSG_VALID } else { MSG_MODIFIED };
                VerificationReport::from_record(record, valid, message)
            }
            SignatureKind::Simple => VerificationReport::from_record(record, false, MSG_SIMPLE),
        })
        .collect()
}

/// Public-upload reconciliation: keep only the signatures whose bound hash
/// matches the uploaded bytes. A mismatching upload yields an empty list,
/// never an error.
pub fn filter_authentic(
    records: &[&SignatureRecord],
    uploaded_hash: &str,
) -> Vec<VerificationReport> {
    records
        .iter()
        .filter(|record| record.content_hash.as_deref() == Some(uploaded_hash))
        .map(|record| VerificationReport::from_record(record, true, MSG_AUTHENTIC))
        .collect()
}
