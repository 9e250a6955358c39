use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use copilot_core::{
    new_connection_id, ConnectionStore, EventFilter, EventStore, RollupStore, StoreError,
};
use copilot_telemetry::{AgentData, ConnectionRecord, DailyRollup, Location, RawEvent};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// One SQLite database backing all three stores
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        tracing::debug!(path = %db_path.display(), "opened database");
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id TEXT NOT NULL,
                component TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                succeeded_jobs INTEGER NOT NULL CHECK (succeeded_jobs >= 0),
                failed_jobs INTEGER NOT NULL CHECK (failed_jobs >= 0),
                contributed_time REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_agent_time
                ON events(component, agent_id, created_at);
            CREATE TABLE IF NOT EXISTS daily_rollups (
                agent_id TEXT NOT NULL,
                day TEXT NOT NULL,
                succeeded INTEGER NOT NULL CHECK (succeeded >= 0),
                failed INTEGER NOT NULL CHECK (failed >= 0),
                cputime REAL NOT NULL,
                generated_at INTEGER NOT NULL,
                PRIMARY KEY (agent_id, day)
            );
            CREATE TABLE IF NOT EXISTS connections (
                id TEXT PRIMARY KEY,
                lng REAL NOT NULL,
                lat REAL NOT NULL,
                updated_at INTEGER NOT NULL,
                connected INTEGER NOT NULL,
                succeeded_jobs INTEGER NOT NULL CHECK (succeeded_jobs >= 0),
                failed_jobs INTEGER NOT NULL CHECK (failed_jobs >= 0),
                agent_uuid TEXT NOT NULL UNIQUE,
                agent_component TEXT NOT NULL,
                agent_data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_connections_updated_at ON connections(updated_at);
            CREATE INDEX IF NOT EXISTS idx_connections_component ON connections(agent_component);
            ",
        )?;
        Ok(())
    }

    fn run<T>(
        &self,
        store: &'static str,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> std::result::Result<T, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::new(store, "connection lock poisoned"))?;
        f(&conn).map_err(|e| StoreError::new(store, e))
    }

    fn row_to_event(row: &Row) -> rusqlite::Result<RawEvent> {
        Ok(RawEvent {
            agent_id: row.get(0)?,
            component: row.get(1)?,
            created_at: from_millis(2, row.get(2)?)?,
            succeeded_jobs: count(row, 3)?,
            failed_jobs: count(row, 4)?,
            contributed_time: row.get(5)?,
        })
    }

    fn row_to_rollup(row: &Row) -> rusqlite::Result<DailyRollup> {
        let day: String = row.get(1)?;
        Ok(DailyRollup {
            agent_id: row.get(0)?,
            date: day
                .parse::<NaiveDate>()
                .map_err(|e| conversion_failure(1, Type::Text, e))?,
            succeeded: count(row, 2)?,
            failed: count(row, 3)?,
            cputime: row.get(4)?,
            generated_at: from_millis(5, row.get(5)?)?,
        })
    }

    fn row_to_connection(row: &Row) -> rusqlite::Result<ConnectionRecord> {
        let agent_data: String = row.get(7)?;
        Ok(ConnectionRecord {
            id: row.get(0)?,
            location: Location(row.get(1)?, row.get(2)?),
            updated_at: from_millis(3, row.get(3)?)?,
            connected: row.get(4)?,
            succeeded_jobs: count(row, 5)?,
            failed_jobs: count(row, 6)?,
            agent_data: serde_json::from_str::<AgentData>(&agent_data)
                .map_err(|e| conversion_failure(7, Type::Text, e))?,
        })
    }
}

const CONNECTION_COLUMNS: &str =
    "id, lng, lat, updated_at, connected, succeeded_jobs, failed_jobs, agent_data";

fn conversion_failure(
    col: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, ty, Box::new(err))
}

fn count(row: &Row, col: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(col)?;
    u64::try_from(value).map_err(|e| conversion_failure(col, Type::Integer, e))
}

/// Counters are stored as SQLite INTEGER, which tops out at `i64::MAX`
fn to_sql_count(
    store: &'static str,
    field: &str,
    value: u64,
) -> std::result::Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| {
        StoreError::new(store, format!("{field} = {value} does not fit in an INTEGER column"))
    })
}

fn from_millis(col: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        conversion_failure(
            col,
            Type::Integer,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("timestamp {} out of range", ms),
            ),
        )
    })
}

impl EventStore for SqliteStore {
    fn find(&self, filter: &EventFilter<'_>) -> std::result::Result<Vec<RawEvent>, StoreError> {
        self.run("event", |conn| {
            let mut stmt = conn.prepare(
                "SELECT agent_id, component, created_at, succeeded_jobs, failed_jobs, contributed_time
                 FROM events
                 WHERE component = ?1 AND agent_id = ?2 AND created_at >= ?3 AND created_at < ?4
                 ORDER BY created_at, id",
            )?;
            let rows = stmt.query_map(
                params![
                    filter.component,
                    filter.agent_id,
                    filter.from.timestamp_millis(),
                    filter.until.timestamp_millis(),
                ],
                Self::row_to_event,
            )?;
            rows.collect()
        })
    }

    fn append(&self, event: &RawEvent) -> std::result::Result<(), StoreError> {
        let succeeded = to_sql_count("event", "succeeded_jobs", event.succeeded_jobs)?;
        let failed = to_sql_count("event", "failed_jobs", event.failed_jobs)?;
        self.run("event", |conn| {
            conn.execute(
                "INSERT INTO events
                 (agent_id, component, created_at, succeeded_jobs, failed_jobs, contributed_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.agent_id,
                    event.component,
                    event.created_at.timestamp_millis(),
                    succeeded,
                    failed,
                    event.contributed_time,
                ],
            )?;
            Ok(())
        })
    }
}

impl RollupStore for SqliteStore {
    fn find_since(
        &self,
        agent_id: &str,
        since: NaiveDate,
    ) -> std::result::Result<Vec<DailyRollup>, StoreError> {
        self.run("rollup", |conn| {
            let mut stmt = conn.prepare(
                "SELECT agent_id, day, succeeded, failed, cputime, generated_at
                 FROM daily_rollups
                 WHERE agent_id = ?1 AND day >= ?2
                 ORDER BY day",
            )?;
            let rows = stmt.query_map(params![agent_id, since.to_string()], Self::row_to_rollup)?;
            rows.collect()
        })
    }

    fn upsert_all(&self, rollups: &[DailyRollup]) -> std::result::Result<(), StoreError> {
        let rows = rollups
            .iter()
            .map(|r| {
                Ok((
                    r,
                    to_sql_count("rollup", "succeeded", r.succeeded)?,
                    to_sql_count("rollup", "failed", r.failed)?,
                ))
            })
            .collect::<std::result::Result<Vec<_>, StoreError>>()?;

        self.run("rollup", |conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO daily_rollups (agent_id, day, succeeded, failed, cputime, generated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(agent_id, day) DO UPDATE SET
                        succeeded = excluded.succeeded,
                        failed = excluded.failed,
                        cputime = excluded.cputime,
                        generated_at = MAX(daily_rollups.generated_at, excluded.generated_at)",
                )?;
                for (rollup, succeeded, failed) in &rows {
                    stmt.execute(params![
                        rollup.agent_id,
                        rollup.date.to_string(),
                        succeeded,
                        failed,
                        rollup.cputime,
                        rollup.generated_at.timestamp_millis(),
                    ])?;
                }
            }
            tx.commit()
        })
    }
}

impl ConnectionStore for SqliteStore {
    fn find_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> std::result::Result<Vec<ConnectionRecord>, StoreError> {
        self.run("connection", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONNECTION_COLUMNS} FROM connections
                 WHERE updated_at >= ?1
                 ORDER BY updated_at"
            ))?;
            let rows = stmt.query_map(params![since.timestamp_millis()], Self::row_to_connection)?;
            rows.collect()
        })
    }

    fn find_one(&self, id: &str) -> std::result::Result<Option<ConnectionRecord>, StoreError> {
        self.run("connection", |conn| {
            conn.query_row(
                &format!("SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = ?1"),
                params![id],
                Self::row_to_connection,
            )
            .optional()
        })
    }

    fn record_heartbeat(
        &self,
        record: &ConnectionRecord,
    ) -> std::result::Result<String, StoreError> {
        let id = if record.id.is_empty() {
            new_connection_id()
        } else {
            record.id.clone()
        };
        let succeeded = to_sql_count("connection", "succeeded_jobs", record.succeeded_jobs)?;
        let failed = to_sql_count("connection", "failed_jobs", record.failed_jobs)?;
        let agent_data = serde_json::to_string(&record.agent_data)
            .map_err(|e| StoreError::new("connection", e))?;

        self.run("connection", |conn| {
            conn.query_row(
                "INSERT INTO connections
                 (id, lng, lat, updated_at, connected, succeeded_jobs, failed_jobs,
                  agent_uuid, agent_component, agent_data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(agent_uuid) DO UPDATE SET
                    lng = excluded.lng,
                    lat = excluded.lat,
                    updated_at = excluded.updated_at,
                    connected = excluded.connected,
                    succeeded_jobs = excluded.succeeded_jobs,
                    failed_jobs = excluded.failed_jobs,
                    agent_component = excluded.agent_component,
                    agent_data = excluded.agent_data
                 RETURNING id",
                params![
                    id,
                    record.location.lng(),
                    record.location.lat(),
                    record.updated_at.timestamp_millis(),
                    record.connected,
                    succeeded,
                    failed,
                    record.agent_data.uuid,
                    record.agent_data.component,
                    agent_data,
                ],
                |row| row.get(0),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn event(agent: &str, component: &str, created_at: DateTime<Utc>) -> RawEvent {
        RawEvent {
            agent_id: agent.to_string(),
            component: component.to_string(),
            created_at,
            succeeded_jobs: 2,
            failed_jobs: 1,
            contributed_time: 3.25,
        }
    }

    fn rollup(day: u32, succeeded: u64, generated_at: DateTime<Utc>) -> DailyRollup {
        DailyRollup {
            agent_id: "a1".to_string(),
            date: date(day),
            succeeded,
            failed: 0,
            cputime: 1.5,
            generated_at,
        }
    }

    fn heartbeat(uuid: &str, updated_at: DateTime<Utc>) -> ConnectionRecord {
        let mut extra = serde_json::Map::new();
        extra.insert("hostname".to_string(), serde_json::json!("node-7"));
        ConnectionRecord {
            id: String::new(),
            location: Location(13.40495, 52.52001),
            updated_at,
            connected: true,
            succeeded_jobs: 40,
            failed_jobs: 2,
            agent_data: AgentData {
                uuid: uuid.to_string(),
                component: "agent".to_string(),
                cpus: Some(16),
                extra,
            },
        }
    }

    #[test]
    fn test_events_filtered_by_component_agent_and_range() {
        let db = SqliteStore::in_memory().unwrap();
        db.append(&event("a1", "agent", at(1, 0))).unwrap();
        db.append(&event("a1", "agent", at(2, 0))).unwrap();
        db.append(&event("a1", "agent", at(3, 0))).unwrap();
        db.append(&event("a1", "monitor", at(2, 1))).unwrap();
        db.append(&event("a2", "agent", at(2, 2))).unwrap();

        let found = db
            .find(&EventFilter {
                component: "agent",
                agent_id: "a1",
                from: at(1, 0),
                until: at(3, 0),
            })
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0], event("a1", "agent", at(1, 0)));
        assert_eq!(found[1].created_at, at(2, 0));
    }

    #[test]
    fn test_rollup_upsert_replaces_and_orders() {
        let db = SqliteStore::in_memory().unwrap();
        let now = at(9, 12);
        db.upsert(&rollup(5, 1, now)).unwrap();
        db.upsert(&rollup(3, 2, now)).unwrap();
        db.upsert(&rollup(5, 7, now - Duration::hours(3))).unwrap();

        let rows = db.find_since("a1", date(1)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(3));
        assert_eq!(rows[1].succeeded, 7);
        assert_eq!(rows[1].generated_at, now);

        assert_eq!(db.find_since("a1", date(4)).unwrap().len(), 1);
        assert!(db.find_since("a2", date(1)).unwrap().is_empty());
    }

    #[test]
    fn test_heartbeat_upserts_by_uuid() {
        let db = SqliteStore::in_memory().unwrap();
        let id = db.record_heartbeat(&heartbeat("u1", at(1, 0))).unwrap();
        let again = db.record_heartbeat(&heartbeat("u1", at(2, 0))).unwrap();
        assert_eq!(id, again);

        let stored = db.find_one(&id).unwrap().unwrap();
        assert_eq!(stored.updated_at, at(2, 0));
        assert_eq!(stored.agent_data.cpus, Some(16));
        assert_eq!(stored.agent_data.extra["hostname"], "node-7");
        assert_eq!(stored.location, Location(13.40495, 52.52001));

        let other = db.record_heartbeat(&heartbeat("u2", at(1, 0))).unwrap();
        assert_ne!(id, other);
    }

    #[test]
    fn test_find_updated_since() {
        let db = SqliteStore::in_memory().unwrap();
        db.record_heartbeat(&heartbeat("u1", at(1, 0))).unwrap();
        db.record_heartbeat(&heartbeat("u2", at(3, 0))).unwrap();

        assert_eq!(db.find_updated_since(at(2, 0)).unwrap().len(), 1);
        assert_eq!(db.find_updated_since(at(1, 0)).unwrap().len(), 2);
        assert!(db.find_one("missing-id").unwrap().is_none());
    }

    #[test]
    fn test_open_persists_across_handles() {
        let temp = tempfile::TempDir::new().unwrap();
        let db_path = temp.path().join("data").join("copilot.db");

        {
            let db = SqliteStore::open(&db_path).unwrap();
            db.upsert(&rollup(2, 4, at(3, 0))).unwrap();
        }

        let db = SqliteStore::open(&db_path).unwrap();
        let rows = db.find_since("a1", date(1)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].succeeded, 4);
    }

    #[test]
    fn test_upsert_all_writes_whole_batch() {
        let db = SqliteStore::in_memory().unwrap();
        let now = at(9, 12);
        let batch: Vec<DailyRollup> = (1..=7).map(|day| rollup(day, day as u64, now)).collect();
        db.upsert_all(&batch).unwrap();

        let rows = db.find_since("a1", date(1)).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[6].succeeded, 7);
    }

    #[test]
    fn test_out_of_range_counts_are_rejected_not_wrapped() {
        let db = SqliteStore::in_memory().unwrap();
        let now = at(9, 12);

        // One bad row keeps the whole batch out
        let err = db
            .upsert_all(&[rollup(1, 3, now), rollup(2, u64::MAX, now)])
            .unwrap_err();
        assert_eq!(err.store, "rollup");
        assert!(db.find_since("a1", date(1)).unwrap().is_empty());

        let mut huge = event("a1", "agent", at(1, 0));
        huge.failed_jobs = u64::MAX;
        assert!(db.append(&huge).is_err());

        let mut beat = heartbeat("u1", at(1, 0));
        beat.succeeded_jobs = i64::MAX as u64 + 1;
        assert!(db.record_heartbeat(&beat).is_err());

        let ok = rollup(3, i64::MAX as u64, now);
        db.upsert(&ok).unwrap();
        assert_eq!(db.find_since("a1", date(1)).unwrap()[0].succeeded, i64::MAX as u64);
    }

    #[test]
    fn test_negative_stored_count_is_a_store_error() {
        let db = SqliteStore::in_memory().unwrap();
        {
            let conn = db.conn.lock().unwrap();
            conn.execute_batch(
                "DROP TABLE daily_rollups;
                 CREATE TABLE daily_rollups (
                    agent_id TEXT NOT NULL, day TEXT NOT NULL, succeeded INTEGER NOT NULL,
                    failed INTEGER NOT NULL, cputime REAL NOT NULL,
                    generated_at INTEGER NOT NULL, PRIMARY KEY (agent_id, day));
                 INSERT INTO daily_rollups VALUES ('a1', '2024-01-02', -1, 0, 0.0, 0);",
            )
            .unwrap();
        }

        let err = db.find_since("a1", date(1)).unwrap_err();
        assert_eq!(err.store, "rollup");
    }
}
