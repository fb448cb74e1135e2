//! Error types for the signing engine.
//!
//! One crate-wide error enum covers the caller-facing taxonomy (validation,
//! not-found, authentication, expired code) and the fatal document-processing
//! class (malformed PDF, QR rendering, image encoding). Processing errors
//! abort the enclosing operation; no partial ledger or artifact mutation is
//! ever committed on their account.

/// Result type alias for signing-engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during composition, signing, and verification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed caller input (empty file, already signed, missing data).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown artifact, verification code, or pending signing code.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Password check failed during a signing request or confirmation.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The pending signing code exists but its validity window has passed.
    /// Detecting this deletes the stale code as a side effect.
    #[error("Signing code expired")]
    ExpiredCode,

    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// The letterhead template asset cannot be used
    #[error("Malformed letterhead template: {0}")]
    MalformedTemplate(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// QR code rendering error
    #[error("QR code error: {0}")]
    Qr(String),

    /// Image error
    #[error("Image error: {0}")]
    Image(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error
    #[error("UTF-8 decoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

impl Error {
    /// Whether this error belongs to the fatal document-processing class
    /// (as opposed to the caller-facing taxonomy).
    pub fn is_processing(&self) -> bool {
        !matches!(
            self,
            Error::Validation(_) | Error::NotFound(_) | Error::Authentication(_) | Error::ExpiredCode
        )
    }
}
