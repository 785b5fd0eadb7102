use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ContextFingerprint;

/// Review state of a flagged login context.
///
/// Blocked and trusted are mutually exclusive; a record that is neither
/// is pending operator review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustState {
    Pending,
    Trusted,
    Blocked,
}

impl TrustState {
    /// Reconstruct the state from the stored boolean pair.
    ///
    /// Returns `None` for the blocked-and-trusted combination, which the
    /// schema forbids.
    pub fn from_flags(is_blocked: bool, is_trusted: bool) -> Option<TrustState> {
        match (is_blocked, is_trusted) {
            (true, true) => None,
            (true, false) => Some(TrustState::Blocked),
            (false, true) => Some(TrustState::Trusted),
            (false, false) => Some(TrustState::Pending),
        }
    }

    /// Project the state onto the stored `(is_blocked, is_trusted)` pair.
    pub fn flags(self) -> (bool, bool) {
        match self {
            TrustState::Pending => (false, false),
            TrustState::Trusted => (false, true),
            TrustState::Blocked => (true, false),
        }
    }

    pub fn is_blocked(self) -> bool {
        self == TrustState::Blocked
    }

    pub fn is_trusted(self) -> bool {
        self == TrustState::Trusted
    }
}

/// Storage key of a persisted trust record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

/// Raised when input is not a well-formed record identifier.
#[derive(Error, Debug)]
#[error("invalid record identifier: '{0}'")]
pub struct InvalidRecordId(pub String);

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(RecordId(id)),
            _ => Err(InvalidRecordId(s.to_string())),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A context previously accepted as a user's legitimate environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownContext {
    pub id: RecordId,
    pub user_id: String,
    #[serde(flatten)]
    pub fingerprint: ContextFingerprint,
    pub first_added: i64,
    pub is_trusted: bool,
}

/// A login context flagged as anomalous for a user.
///
/// The owner's email is denormalized onto the record for audit display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousRecord {
    pub id: RecordId,
    pub user_id: String,
    pub email: String,
    #[serde(flatten)]
    pub fingerprint: ContextFingerprint,
    pub first_seen: i64,
    pub state: TrustState,
}

/// Insert payload for a suspicious record.
///
/// The store assigns the identifier; new records start pending review.
#[derive(Debug, Clone)]
pub struct NewSuspiciousRecord {
    pub user_id: String,
    pub email: String,
    pub fingerprint: ContextFingerprint,
    pub first_seen: i64,
}
