//! Daily contribution rollups recomputed from raw events

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use copilot_telemetry::{DailyRollup, RawEvent};
use tracing::{debug, info};

use crate::clock::{midnight, Clock};
use crate::config::Config;
use crate::error::{ensure_agent, Result};
use crate::store::{EventFilter, EventStore, RollupStore};

/// Summed counters of one agent-day
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayTotals {
    pub succeeded: u64,
    pub failed: u64,
    pub cputime: f64,
}

impl DayTotals {
    fn add(&mut self, event: &RawEvent) {
        self.succeeded = self.succeeded.saturating_add(event.succeeded_jobs);
        self.failed = self.failed.saturating_add(event.failed_jobs);
        self.cputime += event.contributed_time;
    }
}

/// What a single refresh touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub events: usize,
    pub days: usize,
}

/// Group events by the UTC calendar day of their own `created_at` and sum them
pub fn fold_daily<'a, I>(events: I) -> BTreeMap<NaiveDate, DayTotals>
where
    I: IntoIterator<Item = &'a RawEvent>,
{
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for event in events {
        days.entry(event.created_at.date_naive())
            .or_default()
            .add(event);
    }
    days
}

/// Rebuilds `DailyRollup` rows for an agent from the event log
pub struct RollupEngine {
    events: Arc<dyn EventStore>,
    rollups: Arc<dyn RollupStore>,
    clock: Arc<dyn Clock>,
    component: String,
}

impl RollupEngine {
    pub fn new(
        events: Arc<dyn EventStore>,
        rollups: Arc<dyn RollupStore>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            events,
            rollups,
            clock,
            component: config.agent_component.clone(),
        }
    }

    /// Recompute every day in `[start_date, today)` that has events.
    ///
    /// Each touched day is replaced wholesale, so running this repeatedly over
    /// overlapping windows never double-counts. A window that starts today or
    /// later is empty and leaves the stores untouched.
    pub fn refresh(&self, agent_id: &str, start_date: NaiveDate) -> Result<RefreshSummary> {
        ensure_agent(agent_id)?;

        let now = self.clock.now();
        let today = now.date_naive();
        if start_date >= today {
            debug!(agent_id, %start_date, %today, "empty rollup window");
            return Ok(RefreshSummary::default());
        }

        let filter = EventFilter {
            component: &self.component,
            agent_id,
            from: midnight(start_date),
            until: midnight(today),
        };
        let events = self.events.find(&filter)?;

        // Today's events must never reach a rollup, whatever the store returned.
        let days = fold_daily(events.iter().filter(|e| filter.matches(e)));

        let rows: Vec<DailyRollup> = days
            .iter()
            .map(|(date, totals)| DailyRollup {
                agent_id: agent_id.to_string(),
                date: *date,
                succeeded: totals.succeeded,
                failed: totals.failed,
                cputime: totals.cputime,
                generated_at: now,
            })
            .collect();
        if !rows.is_empty() {
            self.rollups.upsert_all(&rows)?;
        }

        info!(
            agent_id,
            %start_date,
            events = events.len(),
            days = days.len(),
            "refreshed daily rollups"
        );

        Ok(RefreshSummary {
            events: events.len(),
            days: days.len(),
        })
    }
}
