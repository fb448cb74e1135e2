//! In-memory collaborators and fixtures shared by the integration suites.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use carimbo::pdf::{ContentStreamBuilder, Page, PdfFile};
use carimbo::{
    ArtifactId, ArtifactStore, Clock, CodeSender, EngineConfig, Error, PasswordVerifier, Result,
    Signer, SigningEngine,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Artifact bytes in a shared map, inspectable after the engine takes
/// ownership of its clone.
#[derive(Clone, Default)]
pub struct MemStore(pub Rc<RefCell<HashMap<ArtifactId, Vec<u8>>>>);

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, artifact: ArtifactId, bytes: Vec<u8>) {
        self.0.borrow_mut().insert(artifact, bytes);
    }

    pub fn bytes(&self, artifact: ArtifactId) -> Vec<u8> {
        self.0.borrow().get(&artifact).cloned().unwrap_or_default()
    }
}

impl ArtifactStore for MemStore {
    fn get_bytes(&self, artifact: ArtifactId) -> Result<Vec<u8>> {
        self.0
            .borrow()
            .get(&artifact)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("artifact {} not stored", artifact)))
    }

    fn set_bytes(&mut self, artifact: ArtifactId, bytes: Vec<u8>) -> Result<()> {
        self.0.borrow_mut().insert(artifact, bytes);
        Ok(())
    }
}

/// Password check by plain string comparison.
#[derive(Clone, Default)]
pub struct PlainPasswords;

impl PasswordVerifier for PlainPasswords {
    fn matches(&self, plaintext: &str, stored_hash: &str) -> bool {
        plaintext == stored_hash
    }
}

/// Captures every sent message as (recipient, subject, body).
#[derive(Clone, Default)]
pub struct RecordingMailer(pub Rc<RefCell<Vec<(String, String, String)>>>);

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn last_subject(&self) -> Option<String> {
        self.0.borrow().last().map(|(_, s, _)| s.clone())
    }

    /// The 6-digit code in the most recent message body.
    pub fn last_code(&self) -> Option<String> {
        let messages = self.0.borrow();
        let (_, _, body) = messages.last()?;
        let digits: Vec<char> = body.chars().collect();
        digits
            .windows(6)
            .find(|w| w.iter().all(|c| c.is_ascii_digit()))
            .map(|w| w.iter().collect())
    }
}

impl CodeSender for RecordingMailer {
    fn send_code(&self, email: &str, subject: &str, html_body: &str) -> Result<()> {
        self.0
            .borrow_mut()
            .push((email.to_string(), subject.to_string(), html_body.to_string()));
        Ok(())
    }
}

/// Manually advanced clock.
#[derive(Clone)]
pub struct MockClock(pub Rc<RefCell<DateTime<Utc>>>);

impl MockClock {
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2025, 3, 9, 14, 0, 0).unwrap();
        Self(Rc::new(RefCell::new(start)))
    }

    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.0.borrow_mut();
        *now += Duration::minutes(minutes);
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.borrow()
    }
}

/// A one-page letterhead template built with the crate's own writer.
pub fn letterhead_bytes() -> Vec<u8> {
    let mut page = Page::new(595.0, 842.0);
    page.add_base_font("Fh", "Helvetica");
    let mut ops = ContentStreamBuilder::new();
    ops.show_text_line("Fh", 14.0, 180.0, 800.0, "Associação Exemplo de Ensino");
    ops.show_text_line("Fh", 8.0, 180.0, 40.0, "Rua das Flores, 123 - Centro");
    page.append_content(&ops.build());
    let mut doc = PdfFile::new();
    doc.add_page(page);
    doc.save().expect("letterhead fixture")
}

pub fn signer(id: u64, name: &str) -> Signer {
    Signer {
        id,
        name: name.to_string(),
        email: format!("signer{}@example.org", id),
        password_hash: "senha123".to_string(),
    }
}

pub type TestEngine = SigningEngine<MemStore, PlainPasswords, RecordingMailer, MockClock>;

/// Engine over the in-memory collaborators, returning the shared handles.
pub fn engine() -> (TestEngine, MemStore, RecordingMailer, MockClock) {
    init_logging();
    let store = MemStore::new();
    let mailer = RecordingMailer::new();
    let clock = MockClock::new();
    let engine = SigningEngine::new(
        &letterhead_bytes(),
        EngineConfig::default(),
        store.clone(),
        PlainPasswords,
        mailer.clone(),
        clock.clone(),
    )
    .expect("engine construction");
    (engine, store, mailer, clock)
}
