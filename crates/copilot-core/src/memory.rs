//! In-process store used for tests and throwaway runs

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use copilot_telemetry::{ConnectionRecord, DailyRollup, RawEvent};

use crate::error::StoreError;
use crate::store::{new_connection_id, ConnectionStore, EventFilter, EventStore, RollupStore};

/// Implements all three store traits over plain collections
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<Vec<RawEvent>>,
    rollups: Mutex<BTreeMap<(String, NaiveDate), DailyRollup>>,
    connections: Mutex<BTreeMap<String, ConnectionRecord>>,
}

fn lock<'a, T>(store: &'static str, m: &'a Mutex<T>) -> Result<MutexGuard<'a, T>, StoreError> {
    m.lock().map_err(|_| StoreError::new(store, "lock poisoned"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for MemoryStore {
    fn find(&self, filter: &EventFilter<'_>) -> Result<Vec<RawEvent>, StoreError> {
        let events = lock("event", &self.events)?;
        let mut found: Vec<RawEvent> = events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        found.sort_by_key(|e| e.created_at);
        Ok(found)
    }

    fn append(&self, event: &RawEvent) -> Result<(), StoreError> {
        lock("event", &self.events)?.push(event.clone());
        Ok(())
    }
}

impl RollupStore for MemoryStore {
    fn find_since(
        &self,
        agent_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<DailyRollup>, StoreError> {
        let rollups = lock("rollup", &self.rollups)?;
        Ok(rollups
            .range((agent_id.to_string(), since)..)
            .take_while(|((agent, _), _)| agent == agent_id)
            .map(|(_, rollup)| rollup.clone())
            .collect())
    }

    fn upsert_all(&self, batch: &[DailyRollup]) -> Result<(), StoreError> {
        let mut rollups = lock("rollup", &self.rollups)?;
        for rollup in batch {
            let key = (rollup.agent_id.clone(), rollup.date);
            let generated_at = match rollups.get(&key) {
                Some(prev) => prev.generated_at.max(rollup.generated_at),
                None => rollup.generated_at,
            };
            rollups.insert(
                key,
                DailyRollup {
                    generated_at,
                    ..rollup.clone()
                },
            );
        }
        Ok(())
    }
}

impl ConnectionStore for MemoryStore {
    fn find_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ConnectionRecord>, StoreError> {
        let connections = lock("connection", &self.connections)?;
        Ok(connections
            .values()
            .filter(|c| c.updated_at >= since)
            .cloned()
            .collect())
    }

    fn find_one(&self, id: &str) -> Result<Option<ConnectionRecord>, StoreError> {
        Ok(lock("connection", &self.connections)?.get(id).cloned())
    }

    fn record_heartbeat(&self, record: &ConnectionRecord) -> Result<String, StoreError> {
        let mut connections = lock("connection", &self.connections)?;
        let existing = connections
            .values()
            .find(|c| c.agent_data.uuid == record.agent_data.uuid)
            .map(|c| c.id.clone());
        let id = match existing {
            Some(id) => id,
            None if record.id.is_empty() => new_connection_id(),
            None => record.id.clone(),
        };
        connections.insert(
            id.clone(),
            ConnectionRecord {
                id: id.clone(),
                ..record.clone()
            },
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, TimeZone};
    use copilot_telemetry::{AgentData, Location};

    fn rollup(agent: &str, day: u32, succeeded: u64, generated_at: DateTime<Utc>) -> DailyRollup {
        DailyRollup {
            agent_id: agent.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            succeeded,
            failed: 0,
            cputime: 0.0,
            generated_at,
        }
    }

    fn heartbeat(uuid: &str, lng: f64) -> ConnectionRecord {
        ConnectionRecord {
            id: String::new(),
            location: Location(lng, 10.0),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            connected: true,
            succeeded_jobs: 0,
            failed_jobs: 0,
            agent_data: AgentData {
                uuid: uuid.to_string(),
                component: "agent".to_string(),
                cpus: None,
                extra: Default::default(),
            },
        }
    }

    #[test]
    fn test_find_since_is_scoped_and_ordered() {
        let store = MemoryStore::new();
        let t = Utc::now();
        store.upsert(&rollup("b", 3, 1, t)).unwrap();
        store.upsert(&rollup("a", 5, 2, t)).unwrap();
        store.upsert(&rollup("a", 2, 3, t)).unwrap();
        store.upsert(&rollup("a", 4, 4, t)).unwrap();

        let rows = store
            .find_since("a", NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
            .unwrap();
        let days: Vec<u32> = rows.iter().map(|r| r.date.day()).collect();
        assert_eq!(days, vec![4, 5]);
    }

    #[test]
    fn test_upsert_replaces_counters_and_keeps_latest_generation() {
        let store = MemoryStore::new();
        let later = Utc::now();
        let earlier = later - Duration::hours(1);

        store.upsert(&rollup("a", 1, 10, later)).unwrap();
        store.upsert(&rollup("a", 1, 4, earlier)).unwrap();

        let rows = store.find_since("a", NaiveDate::MIN).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].succeeded, 4);
        assert_eq!(rows[0].generated_at, later);
    }

    #[test]
    fn test_readers_never_see_partial_batch() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let t = Utc::now();
        let batch: Vec<DailyRollup> = (1..=7).map(|day| rollup("a", day, 1, t)).collect();

        let reader = {
            let store = store.clone();
            std::thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..500 {
                    seen.push(store.find_since("a", NaiveDate::MIN).unwrap().len());
                }
                seen
            })
        };
        store.upsert_all(&batch).unwrap();

        let seen = reader.join().unwrap();
        assert!(seen.iter().all(|&n| n == 0 || n == 7), "saw {seen:?}");
        assert_eq!(store.find_since("a", NaiveDate::MIN).unwrap().len(), 7);
    }

    #[test]
    fn test_heartbeat_keeps_first_id_per_uuid() {
        let store = MemoryStore::new();
        let first = store.record_heartbeat(&heartbeat("u1", 1.0)).unwrap();
        let second = store.record_heartbeat(&heartbeat("u1", 2.0)).unwrap();
        let other = store.record_heartbeat(&heartbeat("u2", 3.0)).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(first.len(), 24);
        assert_eq!(store.find_one(&first).unwrap().unwrap().location.lng(), 2.0);
        assert!(store.find_one("missing").unwrap().is_none());
    }
}
