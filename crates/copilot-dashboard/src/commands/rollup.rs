use chrono::{Duration, NaiveDate, Utc};

use crate::commands::Context;

pub fn run(ctx: &Context, agent: &str, since: Option<NaiveDate>) -> anyhow::Result<()> {
    let services = ctx.services()?;
    let start = since.unwrap_or_else(|| Utc::now().date_naive() - Duration::days(1));

    let summary = services.contributions.engine().refresh(agent, start)?;
    println!(
        "Rolled up {} events into {} days for {} (since {})",
        summary.events, summary.days, agent, start
    );
    Ok(())
}
