//! SQLite implementation of the trust store traits

use super::{KnownContextStore, PersistenceError, SuspiciousRecordStore};
use crate::models::{
    ContextFingerprint, KnownContext, NewSuspiciousRecord, RecordId, SuspiciousRecord, TrustState,
};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed trust record storage
///
/// Implements both store contracts over a single database. The compound
/// unique indexes over (user, fingerprint) make record creation an atomic
/// insert-if-absent, so concurrent first logins from the same context
/// converge on one row.
pub struct SqliteTrustStore {
    conn: Mutex<Connection>,
}

impl SqliteTrustStore {
    /// Create a new SQLite trust store at the specified path
    ///
    /// Creates the database file and initializes the schema if it doesn't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteTrustStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (useful for testing)
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteTrustStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    fn known_from_row(row: &Row<'_>) -> rusqlite::Result<KnownContext> {
        Ok(KnownContext {
            id: RecordId(row.get(0)?),
            user_id: row.get(1)?,
            fingerprint: ContextFingerprint {
                ip: row.get(2)?,
                country: row.get(3)?,
                city: row.get(4)?,
                browser: row.get(5)?,
                platform: row.get(6)?,
                os: row.get(7)?,
                device: row.get(8)?,
                device_type: row.get(9)?,
            },
            first_added: row.get(10)?,
            is_trusted: row.get(11)?,
        })
    }
}

/// Raw suspicious row as stored, before the boolean pair is validated
struct SuspiciousRow {
    id: i64,
    user_id: String,
    email: String,
    fingerprint: ContextFingerprint,
    first_seen: i64,
    is_blocked: bool,
    is_trusted: bool,
}

impl SuspiciousRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<SuspiciousRow> {
        Ok(SuspiciousRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            email: row.get(2)?,
            fingerprint: ContextFingerprint {
                ip: row.get(3)?,
                country: row.get(4)?,
                city: row.get(5)?,
                browser: row.get(6)?,
                platform: row.get(7)?,
                os: row.get(8)?,
                device: row.get(9)?,
                device_type: row.get(10)?,
            },
            first_seen: row.get(11)?,
            is_blocked: row.get(12)?,
            is_trusted: row.get(13)?,
        })
    }

    fn into_record(self) -> Result<SuspiciousRecord, PersistenceError> {
        let state = TrustState::from_flags(self.is_blocked, self.is_trusted).ok_or_else(|| {
            PersistenceError::InvalidData(format!(
                "record {} is both blocked and trusted",
                self.id
            ))
        })?;
        Ok(SuspiciousRecord {
            id: RecordId(self.id),
            user_id: self.user_id,
            email: self.email,
            fingerprint: self.fingerprint,
            first_seen: self.first_seen,
            state,
        })
    }
}

impl KnownContextStore for SqliteTrustStore {
    fn add_known_context(
        &self,
        user_id: &str,
        fingerprint: &ContextFingerprint,
        first_added: i64,
    ) -> Result<KnownContext, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO known_contexts
             (user_id, ip, country, city, browser, platform, os, device, device_type, first_added, is_trusted)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
             ON CONFLICT (user_id, ip, country, city, browser, platform, os, device, device_type)
             DO NOTHING",
            params![
                user_id,
                fingerprint.ip,
                fingerprint.country,
                fingerprint.city,
                fingerprint.browser,
                fingerprint.platform,
                fingerprint.os,
                fingerprint.device,
                fingerprint.device_type,
                first_added,
            ],
        )?;

        // The row exists now whether this call or a concurrent one won.
        let mut stmt = conn.prepare(
            "SELECT id, user_id, ip, country, city, browser, platform, os, device, device_type, first_added, is_trusted
             FROM known_contexts
             WHERE user_id = ? AND ip = ? AND country = ? AND city = ? AND browser = ?
               AND platform = ? AND os = ? AND device = ? AND device_type = ?
             ORDER BY id LIMIT 1",
        )?;
        let ctx = stmt.query_row(
            params![
                user_id,
                fingerprint.ip,
                fingerprint.country,
                fingerprint.city,
                fingerprint.browser,
                fingerprint.platform,
                fingerprint.os,
                fingerprint.device,
                fingerprint.device_type,
            ],
            Self::known_from_row,
        )?;
        Ok(ctx)
    }

    fn get_known_context(&self, user_id: &str) -> Result<Option<KnownContext>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, ip, country, city, browser, platform, os, device, device_type, first_added, is_trusted
             FROM known_contexts
             WHERE user_id = ?
             ORDER BY first_added ASC, id ASC LIMIT 1",
        )?;

        match stmt.query_row(params![user_id], Self::known_from_row) {
            Ok(ctx) => Ok(Some(ctx)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn match_known_context(
        &self,
        user_id: &str,
        fingerprint: &ContextFingerprint,
    ) -> Result<Option<KnownContext>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, ip, country, city, browser, platform, os, device, device_type, first_added, is_trusted
             FROM known_contexts
             WHERE user_id = ? AND ip = ? AND country = ? AND city = ? AND browser = ?
               AND platform = ? AND os = ? AND device = ? AND device_type = ?
             ORDER BY id LIMIT 1",
        )?;

        let result = stmt.query_row(
            params![
                user_id,
                fingerprint.ip,
                fingerprint.country,
                fingerprint.city,
                fingerprint.browser,
                fingerprint.platform,
                fingerprint.os,
                fingerprint.device,
                fingerprint.device_type,
            ],
            Self::known_from_row,
        );

        match result {
            Ok(ctx) => Ok(Some(ctx)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl SuspiciousRecordStore for SqliteTrustStore {
    fn add_suspicious_record(
        &self,
        record: NewSuspiciousRecord,
    ) -> Result<SuspiciousRecord, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO suspicious_records
             (user_id, email, ip, country, city, browser, platform, os, device, device_type, first_seen, is_blocked, is_trusted)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0)
             ON CONFLICT (user_id, ip, country, city, browser, platform, os, device, device_type)
             DO NOTHING",
            params![
                record.user_id,
                record.email,
                record.fingerprint.ip,
                record.fingerprint.country,
                record.fingerprint.city,
                record.fingerprint.browser,
                record.fingerprint.platform,
                record.fingerprint.os,
                record.fingerprint.device,
                record.fingerprint.device_type,
                record.first_seen,
            ],
        )?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, email, ip, country, city, browser, platform, os, device, device_type, first_seen, is_blocked, is_trusted
             FROM suspicious_records
             WHERE user_id = ? AND ip = ? AND country = ? AND city = ? AND browser = ?
               AND platform = ? AND os = ? AND device = ? AND device_type = ?
             ORDER BY id LIMIT 1",
        )?;
        let raw = stmt.query_row(
            params![
                record.user_id,
                record.fingerprint.ip,
                record.fingerprint.country,
                record.fingerprint.city,
                record.fingerprint.browser,
                record.fingerprint.platform,
                record.fingerprint.os,
                record.fingerprint.device,
                record.fingerprint.device_type,
            ],
            SuspiciousRow::from_row,
        )?;
        raw.into_record()
    }

    fn match_suspicious_record(
        &self,
        user_id: &str,
        fingerprint: &ContextFingerprint,
    ) -> Result<Option<SuspiciousRecord>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, email, ip, country, city, browser, platform, os, device, device_type, first_seen, is_blocked, is_trusted
             FROM suspicious_records
             WHERE user_id = ? AND ip = ? AND country = ? AND city = ? AND browser = ?
               AND platform = ? AND os = ? AND device = ? AND device_type = ?
             ORDER BY id LIMIT 1",
        )?;

        let result = stmt.query_row(
            params![
                user_id,
                fingerprint.ip,
                fingerprint.country,
                fingerprint.city,
                fingerprint.browser,
                fingerprint.platform,
                fingerprint.os,
                fingerprint.device,
                fingerprint.device_type,
            ],
            SuspiciousRow::from_row,
        );

        match result {
            Ok(raw) => raw.into_record().map(Some),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_suspicious_record(
        &self,
        id: RecordId,
    ) -> Result<Option<SuspiciousRecord>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, email, ip, country, city, browser, platform, os, device, device_type, first_seen, is_blocked, is_trusted
             FROM suspicious_records
             WHERE id = ?",
        )?;

        match stmt.query_row(params![id.0], SuspiciousRow::from_row) {
            Ok(raw) => raw.into_record().map(Some),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_record_state(&self, id: RecordId, state: TrustState) -> Result<bool, PersistenceError> {
        let (is_blocked, is_trusted) = state.flags();
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE suspicious_records SET is_blocked = ?, is_trusted = ? WHERE id = ?",
            params![is_blocked, is_trusted, id.0],
        )?;
        Ok(updated > 0)
    }

    fn delete_record(&self, id: RecordId) -> Result<bool, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM suspicious_records WHERE id = ?",
            params![id.0],
        )?;
        Ok(deleted > 0)
    }

    fn list_records_by_state(
        &self,
        user_id: &str,
        state: TrustState,
    ) -> Result<Vec<SuspiciousRecord>, PersistenceError> {
        let (is_blocked, is_trusted) = state.flags();
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, email, ip, country, city, browser, platform, os, device, device_type, first_seen, is_blocked, is_trusted
             FROM suspicious_records
             WHERE user_id = ? AND is_blocked = ? AND is_trusted = ?
             ORDER BY first_seen ASC, id ASC",
        )?;

        let rows = stmt
            .query_map(
                params![user_id, is_blocked, is_trusted],
                SuspiciousRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(SuspiciousRow::into_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn create_test_store() -> SqliteTrustStore {
        SqliteTrustStore::in_memory().expect("Failed to create in-memory store")
    }

    fn fingerprint(ip: &str, city: &str) -> ContextFingerprint {
        ContextFingerprint {
            ip: ip.to_string(),
            country: "US".to_string(),
            city: city.to_string(),
            browser: "Chrome 98.0.4758.102".to_string(),
            platform: "Windows".to_string(),
            os: "Windows 10".to_string(),
            device: "Unknown".to_string(),
            device_type: "Desktop".to_string(),
        }
    }

    fn new_record(user: &str, fp: ContextFingerprint, first_seen: i64) -> NewSuspiciousRecord {
        NewSuspiciousRecord {
            user_id: user.to_string(),
            email: format!("{}@example.com", user),
            fingerprint: fp,
            first_seen,
        }
    }

    #[test]
    fn test_known_context_roundtrip() {
        let store = create_test_store();
        let fp = fingerprint("1.1.1.1", "New York");

        assert!(store.get_known_context("alice").unwrap().is_none());

        let ctx = store.add_known_context("alice", &fp, 1700000000).unwrap();
        assert_eq!(ctx.user_id, "alice");
        assert_eq!(ctx.first_added, 1700000000);
        assert!(ctx.is_trusted);

        let found = store.get_known_context("alice").unwrap().unwrap();
        assert_eq!(found.id, ctx.id);
        assert_eq!(found.fingerprint, fp);
    }

    #[test]
    fn test_known_context_insert_is_deduplicated() {
        let store = create_test_store();
        let fp = fingerprint("1.1.1.1", "New York");

        let first = store.add_known_context("alice", &fp, 1700000000).unwrap();
        let second = store.add_known_context("alice", &fp, 1700009999).unwrap();

        // The original row survives, later timestamps are ignored.
        assert_eq!(first.id, second.id);
        assert_eq!(second.first_added, 1700000000);
    }

    #[test]
    fn test_get_known_context_returns_earliest() {
        let store = create_test_store();

        store
            .add_known_context("alice", &fingerprint("2.2.2.2", "Boston"), 2000)
            .unwrap();
        store
            .add_known_context("alice", &fingerprint("1.1.1.1", "New York"), 1000)
            .unwrap();

        let earliest = store.get_known_context("alice").unwrap().unwrap();
        assert_eq!(earliest.first_added, 1000);
        assert_eq!(earliest.fingerprint.ip, "1.1.1.1");
    }

    #[test]
    fn test_known_match_requires_every_field() {
        let store = create_test_store();
        let stored = fingerprint("192.168.1.1", "New York");
        store.add_known_context("alice", &stored, 1700000000).unwrap();

        // Two fields differ; the overlap on the remaining six is not a hit.
        let probe = fingerprint("192.168.1.2", "Los Angeles");
        assert!(store.match_known_context("alice", &probe).unwrap().is_none());

        assert!(store.match_known_context("alice", &stored).unwrap().is_some());
    }

    #[test]
    fn test_known_match_is_scoped_to_user() {
        let store = create_test_store();
        let fp = fingerprint("1.1.1.1", "New York");
        store.add_known_context("alice", &fp, 1700000000).unwrap();

        assert!(store.match_known_context("bob", &fp).unwrap().is_none());
    }

    #[test]
    fn test_suspicious_insert_and_find() {
        let store = create_test_store();
        let fp = fingerprint("9.9.9.9", "Reykjavik");

        let record = store
            .add_suspicious_record(new_record("alice", fp.clone(), 1700000000))
            .unwrap();
        assert_eq!(record.state, TrustState::Pending);
        assert_eq!(record.email, "alice@example.com");

        let found = store
            .match_suspicious_record("alice", &fp)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, record.id);

        let by_id = store.get_suspicious_record(record.id).unwrap().unwrap();
        assert_eq!(by_id.fingerprint, fp);
    }

    #[test]
    fn test_suspicious_insert_is_deduplicated() {
        let store = create_test_store();
        let fp = fingerprint("9.9.9.9", "Reykjavik");

        let first = store
            .add_suspicious_record(new_record("alice", fp.clone(), 1000))
            .unwrap();
        let second = store
            .add_suspicious_record(new_record("alice", fp.clone(), 2000))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.first_seen, 1000);
        assert_eq!(
            store
                .list_records_by_state("alice", TrustState::Pending)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_concurrent_first_sight_creates_one_record() {
        let store = Arc::new(create_test_store());
        let fp = fingerprint("9.9.9.9", "Reykjavik");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let fp = fp.clone();
                std::thread::spawn(move || {
                    store
                        .add_suspicious_record(new_record("alice", fp, 1700000000))
                        .unwrap()
                        .id
                })
            })
            .collect();

        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(
            ids.windows(2).all(|w| w[0] == w[1]),
            "ids diverged: {:?}",
            ids
        );
        assert_eq!(
            store
                .list_records_by_state("alice", TrustState::Pending)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_set_record_state_transitions() {
        let store = create_test_store();
        let record = store
            .add_suspicious_record(new_record("alice", fingerprint("9.9.9.9", "Reykjavik"), 1000))
            .unwrap();

        assert!(store.set_record_state(record.id, TrustState::Blocked).unwrap());
        assert_eq!(
            store.get_suspicious_record(record.id).unwrap().unwrap().state,
            TrustState::Blocked
        );

        assert!(store.set_record_state(record.id, TrustState::Trusted).unwrap());
        assert_eq!(
            store.get_suspicious_record(record.id).unwrap().unwrap().state,
            TrustState::Trusted
        );
    }

    #[test]
    fn test_set_record_state_on_missing_row() {
        let store = create_test_store();
        assert!(!store.set_record_state(RecordId(999), TrustState::Blocked).unwrap());
    }

    #[test]
    fn test_delete_is_hard_remove() {
        let store = create_test_store();
        let record = store
            .add_suspicious_record(new_record("alice", fingerprint("9.9.9.9", "Reykjavik"), 1000))
            .unwrap();

        assert!(store.delete_record(record.id).unwrap());
        assert!(store.get_suspicious_record(record.id).unwrap().is_none());

        // A second delete finds nothing.
        assert!(!store.delete_record(record.id).unwrap());
    }

    #[test]
    fn test_list_by_state_ordering_and_scoping() {
        let store = create_test_store();

        let late = store
            .add_suspicious_record(new_record("alice", fingerprint("2.2.2.2", "Boston"), 2000))
            .unwrap();
        let early = store
            .add_suspicious_record(new_record("alice", fingerprint("1.1.1.1", "New York"), 1000))
            .unwrap();
        let other_user = store
            .add_suspicious_record(new_record("bob", fingerprint("3.3.3.3", "Denver"), 500))
            .unwrap();

        for id in [late.id, early.id, other_user.id] {
            store.set_record_state(id, TrustState::Blocked).unwrap();
        }

        let blocked = store
            .list_records_by_state("alice", TrustState::Blocked)
            .unwrap();
        assert_eq!(blocked.len(), 2);
        assert_eq!(blocked[0].id, early.id);
        assert_eq!(blocked[1].id, late.id);

        assert!(store
            .list_records_by_state("alice", TrustState::Trusted)
            .unwrap()
            .is_empty());
    }
}
