//! Recently seen agents for the dashboard map

use std::sync::Arc;

use chrono::{DateTime, Utc};
use copilot_telemetry::{AgentData, ConnectionRecord, Location};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::store::ConnectionStore;

/// A map marker: connection id and its jittered location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPin {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "loc")]
    pub location: Location,
}

/// Everything known about a connection except its id and location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDetail {
    pub updated_at: DateTime<Utc>,
    pub connected: bool,
    pub succeeded_jobs: u64,
    pub failed_jobs: u64,
    pub agent_data: AgentData,
}

impl From<ConnectionRecord> for ConnectionDetail {
    fn from(record: ConnectionRecord) -> Self {
        Self {
            updated_at: record.updated_at,
            connected: record.connected,
            succeeded_jobs: record.succeeded_jobs,
            failed_jobs: record.failed_jobs,
            agent_data: record.agent_data,
        }
    }
}

pub struct ConnectionIndex {
    store: Arc<dyn ConnectionStore>,
    jitter: f64,
    precision: u32,
}

impl ConnectionIndex {
    pub fn new(store: Arc<dyn ConnectionStore>, config: &Config) -> Self {
        Self {
            store,
            jitter: config.jitter_degrees.max(0.0),
            precision: config.coordinate_precision,
        }
    }

    /// Connections updated at or after `since`, with coordinates blurred so
    /// no marker pinpoints an agent
    pub fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<ConnectionPin>> {
        self.list_since_with(since, &mut rand::thread_rng())
    }

    pub fn list_since_with<R: Rng>(
        &self,
        since: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Vec<ConnectionPin>> {
        let records = self.store.find_updated_since(since)?;
        Ok(records
            .into_iter()
            .map(|record| ConnectionPin {
                location: Location(
                    self.blur(record.location.lng(), rng),
                    self.blur(record.location.lat(), rng),
                ),
                id: record.id,
            })
            .collect())
    }

    pub fn get_detail(&self, id: &str) -> Result<Option<ConnectionDetail>> {
        Ok(self.store.find_one(id)?.map(ConnectionDetail::from))
    }

    fn blur<R: Rng>(&self, coord: f64, rng: &mut R) -> f64 {
        let offset = if self.jitter > 0.0 {
            rng.gen_range(0.0..self.jitter)
        } else {
            0.0
        };
        round_to(coord + offset, self.precision)
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}
