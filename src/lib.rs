// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::match_like_matches_macro)]
#![cfg_attr(test, allow(dead_code))]

//! # Carimbo
//!
//! Electronic-signature stamping and integrity verification for letterheaded
//! PDF documents.
//!
//! The crate composes documents from rich-text content onto an institutional
//! letterhead, appends visual signature stamp pages with a verification QR
//! code, keeps a hash ledger of who signed what, runs the e-mailed one-time
//! code protocol for advanced signatures, and answers both authenticated and
//! public integrity checks.
//!
//! ## Signature kinds
//!
//! - **Simple**: password-gated. Recorded and stamped, but never integrity
//!   proof.
//! - **Advanced**: confirmed with a 6-digit e-mailed code. Bound by SHA-256
//!   to the exact stamped bytes; any later byte change is detected.
//!
//! ## Quick start
//!
//! ```ignore
//! use carimbo::{ArtifactId, EngineConfig, SigningEngine, SystemClock};
//!
//! # fn main() -> carimbo::Result<()> {
//! let mut engine = SigningEngine::new(
//!     &letterhead_bytes,
//!     EngineConfig::default(),
//!     store,
//!     passwords,
//!     mailer,
//!     SystemClock,
//! )?;
//!
//! let doc = ArtifactId::document(42);
//! engine.compose_and_store(doc, "<p>Ata da reunião...</p>")?;
//! engine.request_advanced_signing_code(doc, &signer, "senha", "Ata 42")?;
//! engine.confirm_advanced_signature(doc, &signer, "123456", None)?;
//!
//! for report in engine.verify_signatures(doc)? {
//!     println!("{}: {}", report.signer_name, report.message);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// PDF layer
pub mod pdf;

// Composition and stamping
pub mod compose;
pub mod letterhead;
pub mod qr;
pub mod stamp;

// Signing state
pub mod hash;
pub mod ledger;
pub mod otp;

// Operations
pub mod engine;
pub mod verify;

pub use engine::{
    ArtifactStore, Clock, CodeSender, EngineConfig, PasswordVerifier, Signer, SigningEngine,
    SystemClock,
};
pub use error::{Error, Result};
pub use ledger::{ArtifactFamily, ArtifactId, SignatureKind, SignatureRecord};
pub use verify::VerificationReport;
