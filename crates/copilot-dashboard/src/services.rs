//! Wiring of core services over a single backing store

use std::sync::Arc;

use copilot_core::{
    Clock, Config, ConnectionIndex, ConnectionStore, ContributionService, EventStore,
    RollupEngine, RollupStore,
};

pub struct Services {
    pub contributions: ContributionService,
    pub connections: ConnectionIndex,
}

impl Services {
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>, config: &Config) -> Self
    where
        S: EventStore + RollupStore + ConnectionStore + 'static,
    {
        let engine = RollupEngine::new(store.clone(), store.clone(), clock.clone(), config);
        Self {
            contributions: ContributionService::new(store.clone(), engine, clock, config),
            connections: ConnectionIndex::new(store, config),
        }
    }
}
