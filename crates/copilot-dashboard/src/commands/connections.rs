use chrono::{DateTime, Duration, Utc};

use crate::commands::Context;

pub fn run(ctx: &Context, minutes: i64) -> anyhow::Result<()> {
    let since = window_start(Utc::now(), minutes)?;
    let services = ctx.services()?;

    let pins = services.connections.list_since(since)?;
    tracing::debug!(count = pins.len(), %since, "listed connections");
    println!("{}", serde_json::to_string_pretty(&pins)?);
    Ok(())
}

fn window_start(now: DateTime<Utc>, minutes: i64) -> anyhow::Result<DateTime<Utc>> {
    if minutes < 0 {
        anyhow::bail!("--minutes must not be negative");
    }
    match Duration::try_minutes(minutes).and_then(|window| now.checked_sub_signed(window)) {
        Some(since) => Ok(since),
        None => anyhow::bail!("--minutes {} reaches outside the supported time range", minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;

    #[test]
    fn test_negative_window_is_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = testing::context(temp.path());
        assert!(run(&ctx, -5).is_err());
    }

    #[test]
    fn test_oversized_window_is_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = testing::context(temp.path());
        assert!(run(&ctx, i64::MAX).is_err());
        assert!(run(&ctx, 6_000_000_000_000).is_err());
    }

    #[test]
    fn test_window_start() {
        let now = Utc::now();
        assert_eq!(window_start(now, 0).unwrap(), now);
        assert_eq!(window_start(now, 90).unwrap(), now - Duration::minutes(90));
    }

    #[test]
    fn test_lists_from_empty_database() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = testing::context(temp.path());
        assert!(run(&ctx, 60).is_ok());
    }
}
