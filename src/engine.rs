//! The signing engine: every public operation of the subsystem, wired to the
//! caller's storage, password, mail, and clock collaborators.
//!
//! The engine owns the letterhead, one ledger per artifact family, and the
//! pending OTP table. Mutating operations take `&mut self`; the engine is the
//! serialization point for concurrent signs on one artifact. Every signing
//! operation stages its whole outcome (stamped bytes, new record) before
//! mutating any state.

use chrono::{DateTime, Utc};

use crate::compose::compose;
use crate::error::{Error, Result};
use crate::hash::sha256_hex;
use crate::ledger::{ArtifactFamily, ArtifactId, Ledger, SignatureKind, SignatureRecord};
use crate::letterhead::Letterhead;
use crate::otp::{PendingCodes, CODE_VALIDITY_MINUTES};
use crate::stamp::apply_stamps;
use crate::verify::{filter_authentic, verify_ledger, VerificationReport};

/// Retrieval and replacement of artifact bytes.
pub trait ArtifactStore {
    /// Current bytes of `artifact`; `NotFound` if it does not exist.
    fn get_bytes(&self, artifact: ArtifactId) -> Result<Vec<u8>>;
    /// Replace `artifact`'s bytes.
    fn set_bytes(&mut self, artifact: ArtifactId, bytes: Vec<u8>) -> Result<()>;
}

/// Checks a plaintext password against a stored hash. The hashing scheme is
/// the caller's business.
pub trait PasswordVerifier {
    /// Whether `plaintext` matches `stored_hash`.
    fn matches(&self, plaintext: &str, stored_hash: &str) -> bool;
}

/// Delivers signing codes to the signer, typically by e-mail.
pub trait CodeSender {
    /// Deliver an HTML message carrying a signing code.
    fn send_code(&self, email: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// Time source, injectable so tests can move the clock.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock [`Clock`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A person allowed to sign. Identity management lives outside this crate.
#[derive(Debug, Clone)]
pub struct Signer {
    /// Caller-managed identity key.
    pub id: u64,
    /// Display name, as printed on stamps.
    pub name: String,
    /// Where signing codes are sent.
    pub email: String,
    /// Password hash, checked through the [`PasswordVerifier`].
    pub password_hash: String,
}

/// Engine-wide settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Landing page encoded into stamp QR codes.
    pub verification_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { verification_url: "http://localhost:5173/verificacao".to_string() }
    }
}

const CODE_MAIL_SUBJECT: &str = "Seu Código de Autenticação para Assinatura de Documento";

/// Document signing, stamping, and verification over caller-supplied
/// collaborators.
pub struct SigningEngine<S, P, N, C> {
    store: S,
    passwords: P,
    sender: N,
    clock: C,
    letterhead: Letterhead,
    config: EngineConfig,
    documents: Ledger,
    institutional: Ledger,
    pending: PendingCodes,
}

impl<S, P, N, C> SigningEngine<S, P, N, C>
where
    S: ArtifactStore,
    P: PasswordVerifier,
    N: CodeSender,
    C: Clock,
{
    /// Build an engine around a letterhead template and the collaborators.
    pub fn new(
        letterhead_bytes: &[u8],
        config: EngineConfig,
        store: S,
        passwords: P,
        sender: N,
        clock: C,
    ) -> Result<Self> {
        Ok(Self {
            store,
            passwords,
            sender,
            clock,
            letterhead: Letterhead::from_bytes(letterhead_bytes)?,
            config,
            documents: Ledger::new(),
            institutional: Ledger::new(),
            pending: PendingCodes::new(),
        })
    }

    fn ledger(&self, family: ArtifactFamily) -> &Ledger {
        match family {
            ArtifactFamily::Document => &self.documents,
            ArtifactFamily::Institutional => &self.institutional,
        }
    }

    fn ledger_mut(&mut self, family: ArtifactFamily) -> &mut Ledger {
        match family {
            ArtifactFamily::Document => &mut self.documents,
            ArtifactFamily::Institutional => &mut self.institutional,
        }
    }

    fn check_password(&self, signer: &Signer, password: &str) -> Result<()> {
        if !self.passwords.matches(password, &signer.password_hash) {
            return Err(Error::Authentication("invalid password".into()));
        }
        Ok(())
    }

    fn check_not_signed(&self, artifact: ArtifactId, signer: &Signer) -> Result<()> {
        if self.ledger(artifact.family).has_signer(artifact, signer.id) {
            return Err(Error::Validation("artifact already signed by this signer".into()));
        }
        Ok(())
    }

    /// Compose rich-text content onto the letterhead and return PDF bytes.
    pub fn compose_pdf(&self, html: &str) -> Result<Vec<u8>> {
        compose(&self.letterhead, html)?.save()
    }

    /// Compose and store the result as `artifact`'s bytes.
    pub fn compose_and_store(&mut self, artifact: ArtifactId, html: &str) -> Result<Vec<u8>> {
        let bytes = self.compose_pdf(html)?;
        self.store.set_bytes(artifact, bytes.clone())?;
        Ok(bytes)
    }

    /// Record a password-gated simple signature and re-stamp the artifact.
    ///
    /// The record binds the hash of the bytes as they were before this stamp
    /// pass; simple hashes are never refreshed and are not integrity proof.
    pub fn record_simple_signature(
        &mut self,
        artifact: ArtifactId,
        signer: &Signer,
        password: &str,
    ) -> Result<SignatureRecord> {
        self.check_password(signer, password)?;
        self.check_not_signed(artifact, signer)?;

        let bytes = self.store.get_bytes(artifact)?;
        let mut record = SignatureRecord::new(
            artifact,
            signer.id,
            &signer.name,
            SignatureKind::Simple,
            self.clock.now(),
        );
        record.content_hash = Some(sha256_hex(&bytes));

        let mut all: Vec<SignatureRecord> =
            self.ledger(artifact.family).records_for(artifact).into_iter().cloned().collect();
        all.push(record.clone());
        let stamped = apply_stamps(&self.letterhead, &bytes, &all, &self.config.verification_url)?;

        self.store.set_bytes(artifact, stamped)?;
        log::info!("simple signature by signer {} committed on {}", signer.id, artifact);
        Ok(self.ledger_mut(artifact.family).append(record).clone())
    }

    /// Start an advanced signature: verify the password, issue a 6-digit
    /// code, and send it to the signer's e-mail address.
    pub fn request_advanced_signing_code(
        &mut self,
        artifact: ArtifactId,
        signer: &Signer,
        password: &str,
        artifact_title: &str,
    ) -> Result<()> {
        self.check_password(signer, password)?;
        self.check_not_signed(artifact, signer)?;
        self.store.get_bytes(artifact)?;

        let now = self.clock.now();
        let code = self.pending.issue(signer.id, artifact, now);
        let body = format!(
            "<html><body><h2>Assinatura de Documento</h2>\
             <p>Olá, {}.</p>\
             <p>Use o código a seguir para confirmar a assinatura do documento: \
             <strong>{}</strong></p>\
             <h3 style='color: #0056b3; letter-spacing: 2px;'><strong>{}</strong></h3>\
             <p>Este código é válido por {} minutos.</p>\
             <p>Se você não solicitou esta assinatura, por favor, ignore este e-mail.</p>\
             <br/><p>Atenciosamente,<br/>Sistema de Gestão de Documentos</p></body></html>",
            signer.name, artifact_title, code, CODE_VALIDITY_MINUTES
        );
        self.sender.send_code(&signer.email, CODE_MAIL_SUBJECT, &body)
    }

    /// Confirm a pending advanced signature with the submitted code.
    ///
    /// On success the artifact is re-stamped and every advanced record on it,
    /// this one included, is rebound to the hash of the final stamped bytes.
    pub fn confirm_advanced_signature(
        &mut self,
        artifact: ArtifactId,
        signer: &Signer,
        submitted_code: &str,
        signer_ip: Option<&str>,
    ) -> Result<SignatureRecord> {
        let now = self.clock.now();
        self.pending.validate(signer.id, artifact, submitted_code, now)?;
        // The signer may have signed by another path while this code was
        // pending; the one-signature-per-signer rule holds at commit time too.
        self.check_not_signed(artifact, signer)?;

        let bytes = self.store.get_bytes(artifact)?;
        let mut record = SignatureRecord::new(
            artifact,
            signer.id,
            &signer.name,
            SignatureKind::Advanced,
            now,
        );
        record.content_hash = Some(sha256_hex(&bytes));
        record.signer_ip = signer_ip.map(String::from);

        let mut all: Vec<SignatureRecord> =
            self.ledger(artifact.family).records_for(artifact).into_iter().cloned().collect();
        all.push(record.clone());
        let stamped = apply_stamps(&self.letterhead, &bytes, &all, &self.config.verification_url)?;
        let final_hash = sha256_hex(&stamped);

        self.store.set_bytes(artifact, stamped)?;
        let id = self.ledger_mut(artifact.family).append(record).id;
        self.ledger_mut(artifact.family).refresh_advanced_hashes(artifact, &final_hash);
        self.pending.remove(signer.id, artifact);
        log::info!("advanced signature by signer {} committed on {}", signer.id, artifact);

        self.ledger(artifact.family)
            .records_for(artifact)
            .into_iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound("signature record vanished after append".into()))
    }

    /// Report on every signature of `artifact` against its current bytes.
    pub fn verify_signatures(&self, artifact: ArtifactId) -> Result<Vec<VerificationReport>> {
        let bytes = self.store.get_bytes(artifact)?;
        let current_hash = sha256_hex(&bytes);
        Ok(verify_ledger(&self.ledger(artifact.family).records_for(artifact), &current_hash))
    }

    /// Public verification: match an uploaded file against the artifact the
    /// verification code belongs to. Document records are searched before
    /// institutional ones.
    pub fn verify_by_upload(
        &self,
        uploaded: &[u8],
        verification_code: &str,
    ) -> Result<Vec<VerificationReport>> {
        if uploaded.is_empty() {
            return Err(Error::Validation("uploaded file is empty".into()));
        }
        let uploaded_hash = sha256_hex(uploaded);

        for ledger in [&self.documents, &self.institutional] {
            if let Some(found) = ledger.find_by_code(verification_code) {
                let records = ledger.records_for(found.artifact);
                return Ok(filter_authentic(&records, &uploaded_hash));
            }
        }
        Err(Error::NotFound("verification code not found".into()))
    }

    /// All ledger records for `artifact`, in signing order.
    pub fn signatures(&self, artifact: ArtifactId) -> Vec<SignatureRecord> {
        self.ledger(artifact.family).records_for(artifact).into_iter().cloned().collect()
    }

    /// Forget an artifact: its records and any pending codes for it.
    pub fn remove_artifact(&mut self, artifact: ArtifactId) {
        self.ledger_mut(artifact.family).remove_artifact(artifact);
        self.pending.remove_artifact(artifact);
    }

    /// The loaded letterhead.
    pub fn letterhead(&self) -> &Letterhead {
        &self.letterhead
    }
}
