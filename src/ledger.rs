//! Signature ledger: the authoritative record of who signed which artifact.
//!
//! Records are append-only. The only mutation after the fact is the hash
//! refresh applied to advanced records when their artifact's bytes change,
//! which keeps every advanced signature bound to the final stamped bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which of the two artifact collections a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactFamily {
    /// Regular managed documents.
    Document,
    /// Institutional acts (atas, portarias).
    Institutional,
}

/// Identity of a signable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId {
    /// Collection the artifact lives in.
    pub family: ArtifactFamily,
    /// Caller-assigned key, unique within the family.
    pub key: u64,
}

impl ArtifactId {
    /// Id in the [`ArtifactFamily::Document`] family.
    pub fn document(key: u64) -> Self {
        Self { family: ArtifactFamily::Document, key }
    }

    /// Id in the [`ArtifactFamily::Institutional`] family.
    pub fn institutional(key: u64) -> Self {
        Self { family: ArtifactFamily::Institutional, key }
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.family {
            ArtifactFamily::Document => write!(f, "document/{}", self.key),
            ArtifactFamily::Institutional => write!(f, "institutional/{}", self.key),
        }
    }
}

/// Signature strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureKind {
    /// Password-gated, no integrity binding.
    Simple,
    /// OTP-confirmed, hash-bound to the stamped bytes.
    Advanced,
}

/// One signature over one artifact.
#[derive(Debug, Clone, Serialize)]
pub struct SignatureRecord {
    /// Ledger-assigned sequence id, unique across both families.
    pub id: u64,
    /// Artifact this signature is over.
    pub artifact: ArtifactId,
    /// Signer identity, caller-managed.
    pub signer_id: u64,
    /// Display name at signing time, as printed on the stamp.
    pub signer_name: String,
    /// When the signature was recorded.
    pub signed_at: DateTime<Utc>,
    /// Public lookup key, printed on the stamp and encoded in the QR.
    pub verification_code: String,
    /// Signature strength.
    pub kind: SignatureKind,
    /// SHA-256 of the artifact bytes this signature vouches for. `None` only
    /// transiently, before the first refresh commits.
    pub content_hash: Option<String>,
    /// Remote address captured for advanced confirmations.
    pub signer_ip: Option<String>,
}

impl SignatureRecord {
    /// Build an unappended record with a fresh verification code. The id is
    /// assigned by [`Ledger::append`].
    pub fn new(
        artifact: ArtifactId,
        signer_id: u64,
        signer_name: &str,
        kind: SignatureKind,
        signed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            artifact,
            signer_id,
            signer_name: signer_name.to_string(),
            signed_at,
            verification_code: Uuid::new_v4().to_string(),
            kind,
            content_hash: None,
            signer_ip: None,
        }
    }
}

/// In-memory signature store for one artifact family.
#[derive(Debug, Default)]
pub struct Ledger {
    records: Vec<SignatureRecord>,
    next_id: u64,
}

impl Ledger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, assigning its id. Returns the stored record.
    pub fn append(&mut self, mut record: SignatureRecord) -> &SignatureRecord {
        self.next_id += 1;
        record.id = self.next_id;
        log::info!(
            "ledger: recorded {:?} signature #{} on {} by signer {}",
            record.kind,
            record.id,
            record.artifact,
            record.signer_id
        );
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// All records for one artifact, in signing order.
    pub fn records_for(&self, artifact: ArtifactId) -> Vec<&SignatureRecord> {
        self.records.iter().filter(|r| r.artifact == artifact).collect()
    }

    /// Whether `signer_id` already holds a `kind` signature on `artifact`.
    pub fn has_signed(&self, artifact: ArtifactId, signer_id: u64, kind: SignatureKind) -> bool {
        self.records
            .iter()
            .any(|r| r.artifact == artifact && r.signer_id == signer_id && r.kind == kind)
    }

    /// Whether `signer_id` holds any signature on `artifact`, of either kind.
    /// One signature per signer per artifact is the rule.
    pub fn has_signer(&self, artifact: ArtifactId, signer_id: u64) -> bool {
        self.records
            .iter()
            .any(|r| r.artifact == artifact && r.signer_id == signer_id)
    }

    /// Look a record up by its public verification code.
    pub fn find_by_code(&self, code: &str) -> Option<&SignatureRecord> {
        self.records.iter().find(|r| r.verification_code == code)
    }

    /// Rebind every advanced record of `artifact` to `content_hash`. Simple
    /// records keep their original, non-authoritative hash.
    pub fn refresh_advanced_hashes(&mut self, artifact: ArtifactId, content_hash: &str) {
        let mut refreshed = 0usize;
        for record in &mut self.records {
            if record.artifact == artifact && record.kind == SignatureKind::Advanced {
                record.content_hash = Some(content_hash.to_string());
                refreshed += 1;
            }
        }
        log::debug!("ledger: refreshed {} advanced hash(es) on {}", refreshed, artifact);
    }

    /// Drop every record of `artifact`.
    pub fn remove_artifact(&mut self, artifact: ArtifactId) {
        self.records.retain(|r| r.artifact != artifact);
    }

    /// Total record count across all artifacts.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
