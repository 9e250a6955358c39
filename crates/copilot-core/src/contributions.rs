//! Per-agent contribution series for the dashboard charts

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use copilot_telemetry::DailyRollup;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{midnight, Clock};
use crate::config::Config;
use crate::error::{ensure_agent, Result};
use crate::rollup::RollupEngine;
use crate::store::RollupStore;

/// Hard ceiling on `max_window_days`, about a century
const WINDOW_DAYS_LIMIT: i64 = 36_500;

/// Three parallel series of `(epoch millis of the day, value)` points
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contributions {
    pub succeeded: Vec<(i64, u64)>,
    pub failed: Vec<(i64, u64)>,
    pub cputime: Vec<(i64, f64)>,
}

impl Contributions {
    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty() && self.failed.is_empty() && self.cputime.is_empty()
    }
}

/// Rollups of one window, reshaped, plus the newest generation time seen
struct WindowRead {
    series: Contributions,
    last_generated: DateTime<Utc>,
}

impl WindowRead {
    fn from_rows(rows: &[DailyRollup], inception: DateTime<Utc>) -> Self {
        let mut series = Contributions::default();
        let mut last_generated = inception;
        for row in rows {
            let ts = row.day_millis();
            series.succeeded.push((ts, row.succeeded));
            series.failed.push((ts, row.failed));
            series.cputime.push((ts, row.cputime));
            last_generated = last_generated.max(row.generated_at);
        }
        Self {
            series,
            last_generated,
        }
    }
}

/// First day a stale window has to be recomputed from.
///
/// Normally this is the day rollups were last generated, since earlier days
/// could not have changed. When that lies more than `window_days` before
/// `start_date` the older gap is not worth rescanning and only the day
/// before the window is backfilled.
pub fn refresh_start(
    start_date: NaiveDate,
    last_generated: DateTime<Utc>,
    window_days: i64,
) -> NaiveDate {
    let last = last_generated.date_naive();
    let beyond_window = Duration::try_days(window_days)
        .is_some_and(|window| start_date.signed_duration_since(last) > window);
    if beyond_window {
        start_date.pred_opt().unwrap_or(start_date)
    } else {
        last
    }
}

/// Answers "last N days of stats for agent X", refreshing stale rollups once
pub struct ContributionService {
    rollups: Arc<dyn RollupStore>,
    engine: RollupEngine,
    clock: Arc<dyn Clock>,
    max_window_days: i64,
    inception: DateTime<Utc>,
}

impl ContributionService {
    pub fn new(
        rollups: Arc<dyn RollupStore>,
        engine: RollupEngine,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            rollups,
            engine,
            clock,
            max_window_days: config.max_window_days.clamp(1, WINDOW_DAYS_LIMIT),
            inception: midnight(config.inception),
        }
    }

    /// Daily series for `[today - days, today)`.
    ///
    /// If no fetched rollup was generated today the engine runs once and the
    /// window is read again; whatever that second read returns is the answer,
    /// stale or not.
    pub fn get_contributions(&self, agent_id: &str, days: i64) -> Result<Contributions> {
        if days <= 0 {
            return Ok(Contributions::default());
        }
        ensure_agent(agent_id)?;

        let days = days.min(self.max_window_days);
        let today = self.clock.today();
        let Some(start_date) = today.checked_sub_signed(Duration::days(days)) else {
            debug!(agent_id, days, %today, "window reaches before the calendar, nothing to read");
            return Ok(Contributions::default());
        };

        let mut read = self.read_window(agent_id, start_date)?;
        if read.last_generated.date_naive() != today {
            let from = refresh_start(start_date, read.last_generated, days);
            debug!(
                agent_id,
                last_generated = %read.last_generated,
                %from,
                "contribution rollups stale, refreshing"
            );
            self.engine.refresh(agent_id, from)?;
            read = self.read_window(agent_id, start_date)?;
        }

        Ok(read.series)
    }

    pub fn engine(&self) -> &RollupEngine {
        &self.engine
    }

    fn read_window(&self, agent_id: &str, start_date: NaiveDate) -> Result<WindowRead> {
        let rows = self.rollups.find_since(agent_id, start_date)?;
        Ok(WindowRead::from_rows(&rows, self.inception))
    }
}
