//! Telemetry record types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Component tag of events that count towards contribution rollups
pub const AGENT_COMPONENT: &str = "agent";

/// A raw job-completion event as appended by the reporting pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub agent_id: String,
    pub component: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub succeeded_jobs: u64,
    #[serde(default)]
    pub failed_jobs: u64,
    /// CPU-seconds
    #[serde(default)]
    pub contributed_time: f64,
}

/// Aggregated counters for one agent-day.
///
/// Rows are keyed by `(agent_id, date)` and are overwritten wholesale on
/// every recomputation of that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRollup {
    pub agent_id: String,
    pub date: NaiveDate,
    pub succeeded: u64,
    pub failed: u64,
    pub cputime: f64,
    pub generated_at: DateTime<Utc>,
}

impl DailyRollup {
    /// Milliseconds since the Unix epoch at midnight UTC of `date`
    pub fn day_millis(&self) -> i64 {
        self.date
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp_millis()
    }
}

/// `[longitude, latitude]`, with `[0, 0]` meaning the location is unknown
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location(pub f64, pub f64);

impl Location {
    pub fn lng(&self) -> f64 {
        self.0
    }

    pub fn lat(&self) -> f64 {
        self.1
    }
}

/// Attributes an agent reports about itself in heartbeats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    pub uuid: String,
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus: Option<u32>,
    /// Anything else the agent chose to report
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Last known state of a connected agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "loc", default)]
    pub location: Location,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub succeeded_jobs: u64,
    #[serde(default)]
    pub failed_jobs: u64,
    pub agent_data: AgentData,
}
