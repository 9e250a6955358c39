#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use copilot_core::{
    Clock, Config, ContributionService, EventFilter, EventStore, RollupEngine, StoreError,
};
use copilot_store::SqliteStore;
use copilot_telemetry::{AgentData, ConnectionRecord, Location, RawEvent, AGENT_COMPONENT};

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

pub fn day_ms(day: u32) -> i64 {
    at(day, 0).timestamp_millis()
}

pub fn open_store(dir: &Path) -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open(&dir.join("copilot.db")).unwrap())
}

pub fn agent_event(
    agent: &str,
    created_at: DateTime<Utc>,
    succeeded: u64,
    failed: u64,
    time: f64,
) -> RawEvent {
    RawEvent {
        agent_id: agent.to_string(),
        component: AGENT_COMPONENT.to_string(),
        created_at,
        succeeded_jobs: succeeded,
        failed_jobs: failed,
        contributed_time: time,
    }
}

pub fn heartbeat(uuid: &str, location: Location, updated_at: DateTime<Utc>) -> ConnectionRecord {
    ConnectionRecord {
        id: String::new(),
        location,
        updated_at,
        connected: true,
        succeeded_jobs: 0,
        failed_jobs: 0,
        agent_data: AgentData {
            uuid: uuid.to_string(),
            component: AGENT_COMPONENT.to_string(),
            cpus: Some(8),
            extra: Default::default(),
        },
    }
}

/// Event store that counts how often the log is scanned
pub struct CountingEvents<S> {
    pub inner: Arc<S>,
    pub finds: AtomicUsize,
}

impl<S> CountingEvents<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            finds: AtomicUsize::new(0),
        }
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

impl<S: EventStore> EventStore for CountingEvents<S> {
    fn find(&self, filter: &EventFilter<'_>) -> Result<Vec<RawEvent>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find(filter)
    }

    fn append(&self, event: &RawEvent) -> Result<(), StoreError> {
        self.inner.append(event)
    }
}

/// Contribution service over `store`, with event scans counted
pub fn contribution_service(
    store: Arc<SqliteStore>,
    clock: Arc<dyn Clock>,
) -> (ContributionService, Arc<CountingEvents<SqliteStore>>) {
    let config = Config::default();
    let events = Arc::new(CountingEvents::new(store.clone()));
    let engine = RollupEngine::new(events.clone(), store.clone(), clock.clone(), &config);
    (
        ContributionService::new(store, engine, clock, &config),
        events,
    )
}
