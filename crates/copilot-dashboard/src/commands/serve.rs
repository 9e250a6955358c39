use crate::commands::Context;
use crate::web::{run_server, AppState, GraphiteClient};

pub fn run(mut ctx: Context, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        ctx.settings.host = host;
    }
    if let Some(port) = port {
        ctx.settings.port = port;
    }
    if ctx.settings.static_dir.is_none() {
        let bundled = ctx.paths.static_dir();
        if bundled.is_dir() {
            ctx.settings.static_dir = Some(bundled);
        }
    }

    let services = ctx.services()?;
    let graphite = GraphiteClient::new(&ctx.settings.graphite)?;
    let state = AppState::new(services, graphite, ctx.settings.core.default_days);

    tracing::info!(
        graphite = %ctx.settings.graphite.render_url(),
        database = %ctx.settings.database_path(&ctx.paths).display(),
        "starting dashboard"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_server(&ctx.settings, state))
}
