//! Trust engine for login contexts
//!
//! Classifies incoming login contexts against a user's stored history and
//! manages the trust/block lifecycle of flagged contexts.

pub mod classifier;
pub mod engine;
pub mod lifecycle;

pub use classifier::{Classification, TrustClassifier};
pub use engine::TrustEngine;
pub use lifecycle::TrustLifecycle;

use crate::models::InvalidRecordId;
use crate::persistence::PersistenceError;
use thiserror::Error;

/// Errors surfaced by trust engine operations
///
/// Callers are expected to map `NotFound` distinctly; the other variants
/// map to a generic failure without leaking internals.
#[derive(Error, Debug)]
pub enum TrustError {
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("record not found")]
    NotFound,

    #[error("store error: {0}")]
    Store(#[from] PersistenceError),
}

impl From<InvalidRecordId> for TrustError {
    fn from(err: InvalidRecordId) -> Self {
        TrustError::InvalidIdentifier(err.0)
    }
}
