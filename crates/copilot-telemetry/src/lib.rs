//! Telemetry records reported by Co-Pilot agents, plus JSONL and path helpers

mod io;
mod paths;
mod types;

pub use io::{append_jsonl, atomic_write, read_jsonl, JsonlRead};
pub use paths::Paths;
pub use types::{AgentData, ConnectionRecord, DailyRollup, Location, RawEvent, AGENT_COMPONENT};
