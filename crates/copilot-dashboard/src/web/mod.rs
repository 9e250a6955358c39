//! HTTP API over the core services

mod error;
mod graphite;
mod routes;
mod server;
mod state;

pub use graphite::GraphiteClient;
pub use server::run_server;
pub use state::AppState;
