//! Contribution rollups and connection lookups behind the dashboard API

mod clock;
mod config;
mod connections;
mod contributions;
mod error;
mod memory;
mod rollup;
mod store;

pub use clock::{midnight, Clock, FixedClock, SystemClock};
pub use config::Config;
pub use connections::{ConnectionDetail, ConnectionIndex, ConnectionPin};
pub use contributions::{refresh_start, ContributionService, Contributions};
pub use error::{Error, Result, StoreError};
pub use memory::MemoryStore;
pub use rollup::{fold_daily, DayTotals, RefreshSummary, RollupEngine};
pub use store::{new_connection_id, ConnectionStore, EventFilter, EventStore, RollupStore};
