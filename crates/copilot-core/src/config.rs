//! Tunables for rollups and connection listings

use chrono::NaiveDate;
use copilot_telemetry::AGENT_COMPONENT;
use serde::{Deserialize, Serialize};

/// Core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Component tag of events that participate in rollups
    pub agent_component: String,

    /// Window used when a caller does not ask for a number of days
    pub default_days: i64,

    /// Larger windows are clamped to this many days
    pub max_window_days: i64,

    /// Upper bound of the random offset added to each coordinate axis
    pub jitter_degrees: f64,

    /// Decimal places kept after jittering
    pub coordinate_precision: u32,

    /// Stand-in for "last generated" when an agent has no rollups yet
    pub inception: NaiveDate,
}

impl Config {
    pub fn new() -> Self {
        Self {
            agent_component: AGENT_COMPONENT.to_string(),
            default_days: 7,
            max_window_days: 3650,
            jitter_degrees: 0.0004,
            coordinate_precision: 5,
            inception: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
