use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};

use crate::ClientResult;
use crate::clock::Clock;
use crate::state::map_sqlite_error;

/// Key-value store with expiry, as consumed by the report generator.
///
/// `get` must report a miss once the TTL given to `set` has elapsed.
pub trait ReportCache {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str, ttl: Duration) -> ClientResult<()>;
}

/// Cache rows kept in the store's `internal_report_cache` table so entries
/// outlive a single CLI invocation.
pub struct SqliteReportCache<'a> {
    connection: &'a Connection,
    db_path: &'a Path,
    clock: &'a dyn Clock,
}

impl<'a> SqliteReportCache<'a> {
    pub fn new(connection: &'a Connection, db_path: &'a Path, clock: &'a dyn Clock) -> Self {
        Self {
            connection,
            db_path,
            clock,
        }
    }
}

impl ReportCache for SqliteReportCache<'_> {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        self.connection
            .query_row(
                "SELECT payload FROM internal_report_cache
                 WHERE cache_key = ?1 AND expires_at > ?2
                 LIMIT 1",
                params![key, self.clock.unix_seconds()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|error| map_sqlite_error(self.db_path, &error))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> ClientResult<()> {
        let now = self.clock.unix_seconds();
        let expires_at = now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));

        self.connection
            .execute(
                "DELETE FROM internal_report_cache WHERE expires_at <= ?1",
                params![now],
            )
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;
        self.connection
            .execute(
                "INSERT INTO internal_report_cache (cache_key, payload, expires_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (cache_key) DO UPDATE
                 SET payload = excluded.payload, expires_at = excluded.expires_at",
                params![key, value, expires_at],
            )
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;
        Ok(())
    }
}

/// Process-local cache for embedding callers and tests.
pub struct MemoryReportCache<'a> {
    entries: RefCell<HashMap<String, (String, i64)>>,
    clock: &'a dyn Clock,
}

impl<'a> MemoryReportCache<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            clock,
        }
    }

    pub fn evict(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

impl ReportCache for MemoryReportCache<'_> {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let now = self.clock.unix_seconds();
        let entries = self.entries.borrow();
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(payload, _)| payload.clone()))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> ClientResult<()> {
        let now = self.clock.unix_seconds();
        let expires_at = now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
        let mut entries = self.entries.borrow_mut();
        entries.retain(|_, (_, entry_expires_at)| *entry_expires_at > now);
        entries.insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }
}
