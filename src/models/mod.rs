mod fingerprint;
mod record;

pub use fingerprint::ContextFingerprint;
pub use record::{
    InvalidRecordId, KnownContext, NewSuspiciousRecord, RecordId, SuspiciousRecord, TrustState,
};
