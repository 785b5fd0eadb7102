pub mod config;
pub mod models;
pub mod output;
pub mod persistence;
pub mod trust;

// Re-export commonly used types
pub use models::{ContextFingerprint, KnownContext, RecordId, SuspiciousRecord, TrustState};
pub use persistence::{KnownContextStore, SqliteTrustStore, SuspiciousRecordStore};
pub use trust::{Classification, TrustClassifier, TrustEngine, TrustError, TrustLifecycle};
