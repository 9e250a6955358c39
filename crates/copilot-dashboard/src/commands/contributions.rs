use crate::commands::Context;

pub fn run(ctx: &Context, agent: &str, days: Option<i64>) -> anyhow::Result<()> {
    let services = ctx.services()?;
    let days = days.unwrap_or(ctx.settings.core.default_days);

    let series = services.contributions.get_contributions(agent, days)?;
    println!("{}", serde_json::to_string_pretty(&series)?);
    Ok(())
}
