//! Shared state handed to every handler

use std::sync::Arc;

use super::graphite::GraphiteClient;
use crate::services::Services;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub graphite: GraphiteClient,
    /// Window used by `/api/contributions` when `days` is absent
    pub default_days: i64,
}

impl AppState {
    pub fn new(services: Services, graphite: GraphiteClient, default_days: i64) -> Self {
        Self {
            services: Arc::new(services),
            graphite,
            default_days,
        }
    }
}
