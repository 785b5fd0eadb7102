//! Persistence module for trust records
//!
//! This module defines the store contracts the trust engine depends on.
//! Implementations can use different storage backends (SQLite, Postgres,
//! etc.); the engine only sees these traits.

pub mod sqlite_store;

pub use sqlite_store::SqliteTrustStore;

use crate::models::{
    ContextFingerprint, KnownContext, NewSuspiciousRecord, RecordId, SuspiciousRecord, TrustState,
};
use thiserror::Error;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),
}

/// Store contract for contexts accepted as a user's legitimate environment
pub trait KnownContextStore: Send + Sync {
    /// Add a known context unless one already exists for the same
    /// (user, fingerprint) pair; returns the surviving row either way.
    fn add_known_context(
        &self,
        user_id: &str,
        fingerprint: &ContextFingerprint,
        first_added: i64,
    ) -> Result<KnownContext, PersistenceError>;

    /// Get the user's earliest recorded context, or `None` if the user
    /// has none yet.
    fn get_known_context(&self, user_id: &str) -> Result<Option<KnownContext>, PersistenceError>;

    /// Find the user's context whose fingerprint equals the supplied one.
    ///
    /// Partial field overlap is a non-match, never an error.
    fn match_known_context(
        &self,
        user_id: &str,
        fingerprint: &ContextFingerprint,
    ) -> Result<Option<KnownContext>, PersistenceError>;
}

/// Store contract for flagged login contexts
pub trait SuspiciousRecordStore: Send + Sync {
    /// Add a pending record unless one already exists for the same
    /// (user, fingerprint) pair; returns the surviving row either way.
    ///
    /// The loser of a concurrent first-sight race observes the winner's
    /// row rather than an error.
    fn add_suspicious_record(
        &self,
        record: NewSuspiciousRecord,
    ) -> Result<SuspiciousRecord, PersistenceError>;

    /// Find the user's record whose fingerprint equals the supplied one.
    ///
    /// Partial field overlap is a non-match. Should duplicates exist, the
    /// lowest identifier wins so the result is deterministic.
    fn match_suspicious_record(
        &self,
        user_id: &str,
        fingerprint: &ContextFingerprint,
    ) -> Result<Option<SuspiciousRecord>, PersistenceError>;

    fn get_suspicious_record(
        &self,
        id: RecordId,
    ) -> Result<Option<SuspiciousRecord>, PersistenceError>;

    /// Overwrite the review state; returns `false` when the identifier
    /// resolves to no row.
    fn set_record_state(&self, id: RecordId, state: TrustState) -> Result<bool, PersistenceError>;

    /// Hard-remove a record; returns `false` when the identifier resolves
    /// to no row.
    fn delete_record(&self, id: RecordId) -> Result<bool, PersistenceError>;

    /// All of the user's records in the given state, earliest seen first.
    fn list_records_by_state(
        &self,
        user_id: &str,
        state: TrustState,
    ) -> Result<Vec<SuspiciousRecord>, PersistenceError>;
}
