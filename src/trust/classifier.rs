//! Trust classification of incoming login contexts
//!
//! Compares an incoming fingerprint against the user's known contexts and
//! flagged records and returns a categorical verdict. Classification never
//! writes; record creation is an explicit follow-up on the engine.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::models::{ContextFingerprint, TrustState};
use crate::persistence::{KnownContextStore, SuspiciousRecordStore};
use crate::trust::TrustError;

/// Categorical verdict on an incoming login context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Matches a known context; the login environment is established.
    Known,
    /// Matches a flagged record an operator has explicitly trusted;
    /// callers treat this the same as `Known`.
    TrustedSuspicious,
    /// Matches a flagged record still pending review.
    Suspicious,
    /// Matches a blocked record; callers must deny the attempt.
    Blocked,
    /// Matches nothing on file for the user.
    New,
}

impl Classification {
    /// Whether the auth flow may proceed without a challenge.
    pub fn is_established(self) -> bool {
        matches!(self, Classification::Known | Classification::TrustedSuspicious)
    }

    /// Whether the auth flow must deny the attempt.
    pub fn must_deny(self) -> bool {
        self == Classification::Blocked
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Classification::Known => "known",
            Classification::TrustedSuspicious => "trusted_suspicious",
            Classification::Suspicious => "suspicious",
            Classification::Blocked => "blocked",
            Classification::New => "new",
        };
        write!(f, "{}", name)
    }
}

/// Classifies login contexts against the two record stores
pub struct TrustClassifier {
    known: Arc<dyn KnownContextStore>,
    suspicious: Arc<dyn SuspiciousRecordStore>,
}

impl TrustClassifier {
    pub fn new(
        known: Arc<dyn KnownContextStore>,
        suspicious: Arc<dyn SuspiciousRecordStore>,
    ) -> Self {
        TrustClassifier { known, suspicious }
    }

    /// Classify a login context against the user's stored history.
    ///
    /// Known contexts win over flagged records when a fingerprint matches
    /// both. A `New` verdict creates nothing; the caller decides whether
    /// to flag or remember the context afterwards.
    pub fn classify(
        &self,
        user_id: &str,
        fingerprint: &ContextFingerprint,
    ) -> Result<Classification, TrustError> {
        if self.known.match_known_context(user_id, fingerprint)?.is_some() {
            log::debug!("login context for user '{}' is known", user_id);
            return Ok(Classification::Known);
        }

        let verdict = match self.suspicious.match_suspicious_record(user_id, fingerprint)? {
            Some(record) => match record.state {
                TrustState::Blocked => Classification::Blocked,
                TrustState::Trusted => Classification::TrustedSuspicious,
                TrustState::Pending => Classification::Suspicious,
            },
            None => Classification::New,
        };

        log::debug!("classified login context for user '{}' as {}", user_id, verdict);
        Ok(verdict)
    }
}
