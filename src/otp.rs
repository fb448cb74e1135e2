//! One-time codes for advanced signing.
//!
//! A pending code binds (signer, artifact) to a 6-digit code and an expiry
//! instant. Codes are single-use: confirmation removes them, and an expired
//! code is removed the moment it is looked up. Expiry is lazy; nothing
//! sweeps the map in the background.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::error::{Error, Result};
use crate::ledger::ArtifactId;

/// How long an issued code stays valid.
pub const CODE_VALIDITY_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
}

/// Outstanding signing codes, keyed by signer and artifact.
#[derive(Debug, Default)]
pub struct PendingCodes {
    codes: HashMap<(u64, ArtifactId), PendingCode>,
}

impl PendingCodes {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh zero-padded 6-digit code, replacing any earlier one for
    /// the same signer and artifact. Returns the code for delivery.
    pub fn issue(&mut self, signer_id: u64, artifact: ArtifactId, now: DateTime<Utc>) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..=999_999u32));
        let expires_at = now + Duration::minutes(CODE_VALIDITY_MINUTES);
        log::info!(
            "otp: issued code for signer {} on {}, valid until {}",
            signer_id,
            artifact,
            expires_at
        );
        self.codes
            .insert((signer_id, artifact), PendingCode { code: code.clone(), expires_at });
        code
    }

    /// Check `submitted` against the pending code without consuming it.
    ///
    /// Missing or already-consumed codes are a `NotFound`; an expired code is
    /// removed and reported as `ExpiredCode`; a wrong digit sequence is an
    /// `Authentication` failure and leaves the code pending.
    pub fn validate(
        &mut self,
        signer_id: u64,
        artifact: ArtifactId,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let key = (signer_id, artifact);
        let pending = self
            .codes
            .get(&key)
            .ok_or_else(|| Error::NotFound("no pending signing code".into()))?;
        if now > pending.expires_at {
            self.codes.remove(&key);
            return Err(Error::ExpiredCode);
        }
        if pending.code != submitted {
            return Err(Error::Authentication("invalid signing code".into()));
        }
        Ok(())
    }

    /// Consume the code after a successful confirmation commit.
    pub fn remove(&mut self, signer_id: u64, artifact: ArtifactId) {
        self.codes.remove(&(signer_id, artifact));
    }

    /// Drop every pending code for `artifact`.
    pub fn remove_artifact(&mut self, artifact: ArtifactId) {
        self.codes.retain(|(_, a), _| *a != artifact);
    }
}
