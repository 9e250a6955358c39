mod cli;
mod commands;
mod services;
mod settings;
mod web;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Context;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let Cli { config, command } = Cli::parse();
    let load = || Context::load(config.as_deref());

    match command {
        Commands::Init { force } => commands::init::run(force),
        Commands::Serve { host, port } => commands::serve::run(load()?, host, port),
        Commands::Import {
            events,
            connections,
        } => commands::import::run(&load()?, events.as_deref(), connections.as_deref()),
        Commands::Rollup { agent, since } => commands::rollup::run(&load()?, &agent, since),
        Commands::Contributions { agent, days } => {
            commands::contributions::run(&load()?, &agent, days)
        }
        Commands::Connections { minutes } => commands::connections::run(&load()?, minutes),
        Commands::Version => commands::version::run(),
    }
}
