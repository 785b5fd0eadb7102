//! Engine facade binding classification, first-sight record creation, and
//! lifecycle management behind a single constructor.

use std::sync::Arc;

use crate::models::{
    ContextFingerprint, KnownContext, NewSuspiciousRecord, RecordId, SuspiciousRecord,
};
use crate::persistence::{KnownContextStore, SuspiciousRecordStore};
use crate::trust::{Classification, TrustClassifier, TrustError, TrustLifecycle};

/// The login-context trust engine
///
/// Holds no per-call state; safe to share across request handlers. All
/// coordination happens in the backing stores.
pub struct TrustEngine {
    classifier: TrustClassifier,
    lifecycle: TrustLifecycle,
    known: Arc<dyn KnownContextStore>,
    suspicious: Arc<dyn SuspiciousRecordStore>,
}

impl TrustEngine {
    pub fn new(
        known: Arc<dyn KnownContextStore>,
        suspicious: Arc<dyn SuspiciousRecordStore>,
    ) -> Self {
        TrustEngine {
            classifier: TrustClassifier::new(known.clone(), suspicious.clone()),
            lifecycle: TrustLifecycle::new(known.clone(), suspicious.clone()),
            known,
            suspicious,
        }
    }

    /// Classify a login context against the user's stored history.
    pub fn classify(
        &self,
        user_id: &str,
        fingerprint: &ContextFingerprint,
    ) -> Result<Classification, TrustError> {
        self.classifier.classify(user_id, fingerprint)
    }

    /// Record a context as the user's legitimate environment.
    ///
    /// Insert-if-absent: concurrent first logins converge on one row.
    pub fn remember_context(
        &self,
        user_id: &str,
        fingerprint: &ContextFingerprint,
        now: i64,
    ) -> Result<KnownContext, TrustError> {
        let ctx = self.known.add_known_context(user_id, fingerprint, now)?;
        log::info!("remembered context {} for user '{}'", ctx.id, user_id);
        Ok(ctx)
    }

    /// Flag a context as anomalous for the user.
    ///
    /// The record starts pending review. Insert-if-absent: the loser of a
    /// first-sight race observes the winner's row, never an error.
    pub fn flag_context(
        &self,
        user_id: &str,
        email: &str,
        fingerprint: &ContextFingerprint,
        now: i64,
    ) -> Result<SuspiciousRecord, TrustError> {
        let record = self.suspicious.add_suspicious_record(NewSuspiciousRecord {
            user_id: user_id.to_string(),
            email: email.to_string(),
            fingerprint: fingerprint.clone(),
            first_seen: now,
        })?;
        log::info!("flagged context for user '{}' as record {}", user_id, record.id);
        Ok(record)
    }

    pub fn block(&self, id: RecordId) -> Result<(), TrustError> {
        self.lifecycle.block(id)
    }

    pub fn unblock(&self, id: RecordId) -> Result<(), TrustError> {
        self.lifecycle.unblock(id)
    }

    pub fn delete(&self, id: RecordId) -> Result<(), TrustError> {
        self.lifecycle.delete(id)
    }

    pub fn list_blocked(&self, user_id: &str) -> Result<Vec<SuspiciousRecord>, TrustError> {
        self.lifecycle.list_blocked(user_id)
    }

    pub fn list_trusted(&self, user_id: &str) -> Result<Vec<SuspiciousRecord>, TrustError> {
        self.lifecycle.list_trusted(user_id)
    }

    pub fn known_context(&self, user_id: &str) -> Result<KnownContext, TrustError> {
        self.lifecycle.known_context(user_id)
    }
}
