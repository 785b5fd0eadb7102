//! Lifecycle operations over flagged login contexts
//!
//! Block, unblock, and delete address records by identifier; list and get
//! operations are scoped per user. State writes always assert a whole
//! `TrustState`, so a record can never end up blocked and trusted at once.

use std::sync::Arc;

use crate::models::{KnownContext, RecordId, SuspiciousRecord, TrustState};
use crate::persistence::{KnownContextStore, SuspiciousRecordStore};
use crate::trust::TrustError;

/// Operator-facing lifecycle manager for trust records
pub struct TrustLifecycle {
    known: Arc<dyn KnownContextStore>,
    suspicious: Arc<dyn SuspiciousRecordStore>,
}

impl TrustLifecycle {
    pub fn new(
        known: Arc<dyn KnownContextStore>,
        suspicious: Arc<dyn SuspiciousRecordStore>,
    ) -> Self {
        TrustLifecycle { known, suspicious }
    }

    /// Block a flagged record. Re-blocking an already blocked record
    /// succeeds and re-asserts the same state.
    pub fn block(&self, id: RecordId) -> Result<(), TrustError> {
        if self.suspicious.set_record_state(id, TrustState::Blocked)? {
            log::info!("blocked suspicious record {}", id);
            Ok(())
        } else {
            Err(TrustError::NotFound)
        }
    }

    /// Unblock a flagged record, granting it trusted standing.
    ///
    /// Unblock is an explicit trust grant, not a reset to pending review.
    pub fn unblock(&self, id: RecordId) -> Result<(), TrustError> {
        if self.suspicious.set_record_state(id, TrustState::Trusted)? {
            log::info!("unblocked suspicious record {}, now trusted", id);
            Ok(())
        } else {
            Err(TrustError::NotFound)
        }
    }

    /// Hard-remove a flagged record. Not reversible.
    pub fn delete(&self, id: RecordId) -> Result<(), TrustError> {
        if self.suspicious.delete_record(id)? {
            log::info!("deleted suspicious record {}", id);
            Ok(())
        } else {
            Err(TrustError::NotFound)
        }
    }

    /// All blocked records for the user, earliest seen first.
    /// Empty when the user has none.
    pub fn list_blocked(&self, user_id: &str) -> Result<Vec<SuspiciousRecord>, TrustError> {
        Ok(self.suspicious.list_records_by_state(user_id, TrustState::Blocked)?)
    }

    /// All trusted records for the user, earliest seen first.
    /// Empty when the user has none.
    pub fn list_trusted(&self, user_id: &str) -> Result<Vec<SuspiciousRecord>, TrustError> {
        Ok(self.suspicious.list_records_by_state(user_id, TrustState::Trusted)?)
    }

    /// The user's known context, or `NotFound` if none has been recorded.
    pub fn known_context(&self, user_id: &str) -> Result<KnownContext, TrustError> {
        self.known
            .get_known_context(user_id)?
            .ok_or(TrustError::NotFound)
    }
}
