use std::path::Path;

use copilot_core::{ConnectionStore, EventStore};
use copilot_telemetry::{read_jsonl, ConnectionRecord, RawEvent};

use crate::commands::Context;

/// Counts reported after an import
#[derive(Debug, Default, PartialEq)]
struct ImportSummary {
    events: usize,
    connections: usize,
    skipped: usize,
}

pub fn run(
    ctx: &Context,
    events: Option<&Path>,
    connections: Option<&Path>,
) -> anyhow::Result<()> {
    if events.is_none() && connections.is_none() {
        anyhow::bail!("nothing to import; pass --events and/or --connections");
    }

    let store = ctx.open_store()?;
    let summary = import_into(store.as_ref(), events, connections)?;

    println!(
        "Imported {} events and {} connection heartbeats",
        summary.events, summary.connections
    );
    if summary.skipped > 0 {
        println!("Skipped {} malformed lines", summary.skipped);
    }
    Ok(())
}

fn import_into<S>(
    store: &S,
    events: Option<&Path>,
    connections: Option<&Path>,
) -> anyhow::Result<ImportSummary>
where
    S: EventStore + ConnectionStore,
{
    let mut summary = ImportSummary::default();

    if let Some(path) = events {
        let read = read_jsonl::<RawEvent>(path)?;
        if read.skipped > 0 {
            tracing::warn!(path = %path.display(), skipped = read.skipped, "malformed event lines");
        }
        for event in &read.records {
            store.append(event)?;
        }
        summary.events = read.records.len();
        summary.skipped += read.skipped;
    }

    if let Some(path) = connections {
        let read = read_jsonl::<ConnectionRecord>(path)?;
        if read.skipped > 0 {
            tracing::warn!(path = %path.display(), skipped = read.skipped, "malformed heartbeat lines");
        }
        for record in &read.records {
            store.record_heartbeat(record)?;
        }
        summary.connections = read.records.len();
        summary.skipped += read.skipped;
    }

    Ok(summary)
}
