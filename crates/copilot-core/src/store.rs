//! Contracts the core needs from its backing stores.
//!
//! Implementations own their concurrency control; every method may be
//! called from several threads at once.

use chrono::{DateTime, NaiveDate, Utc};
use copilot_telemetry::{ConnectionRecord, DailyRollup, RawEvent};

use crate::error::StoreError;

/// Selects raw events of one component and agent in `[from, until)`
#[derive(Debug, Clone, PartialEq)]
pub struct EventFilter<'a> {
    pub component: &'a str,
    pub agent_id: &'a str,
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl EventFilter<'_> {
    pub fn matches(&self, event: &RawEvent) -> bool {
        event.component == self.component
            && event.agent_id == self.agent_id
            && event.created_at >= self.from
            && event.created_at < self.until
    }
}

/// Append-only log of raw agent events
pub trait EventStore: Send + Sync {
    /// Events matching `filter`, ordered by `created_at`
    fn find(&self, filter: &EventFilter<'_>) -> Result<Vec<RawEvent>, StoreError>;

    fn append(&self, event: &RawEvent) -> Result<(), StoreError>;
}

/// Daily rollups keyed by `(agent_id, date)`
pub trait RollupStore: Send + Sync {
    /// Rollups of `agent_id` with `date >= since`, oldest first
    fn find_since(&self, agent_id: &str, since: NaiveDate)
        -> Result<Vec<DailyRollup>, StoreError>;

    /// Replace the counters stored for each rollup's key, all or nothing.
    ///
    /// Counters are overwritten, never added to. `generated_at` is kept at
    /// the later of the stored and the new value. Readers never observe a
    /// batch half applied.
    fn upsert_all(&self, rollups: &[DailyRollup]) -> Result<(), StoreError>;

    fn upsert(&self, rollup: &DailyRollup) -> Result<(), StoreError> {
        self.upsert_all(std::slice::from_ref(rollup))
    }
}

/// Last-seen state of agent connections
pub trait ConnectionStore: Send + Sync {
    /// Connections with `updated_at >= since`
    fn find_updated_since(&self, since: DateTime<Utc>)
        -> Result<Vec<ConnectionRecord>, StoreError>;

    fn find_one(&self, id: &str) -> Result<Option<ConnectionRecord>, StoreError>;

    /// Insert or update the connection of `record.agent_data.uuid` and
    /// return its id. An agent keeps the id it was first stored under; an
    /// empty `record.id` asks the store to assign one.
    fn record_heartbeat(&self, record: &ConnectionRecord) -> Result<String, StoreError>;
}

/// Fresh opaque connection id: 24 lowercase hex digits
pub fn new_connection_id() -> String {
    format!("{:024x}", rand::random::<u128>() >> 32)
}
