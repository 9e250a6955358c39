pub mod connections;
pub mod contributions;
pub mod import;
pub mod init;
pub mod rollup;
pub mod serve;
pub mod version;

use std::path::Path;
use std::sync::Arc;

use copilot_core::SystemClock;
use copilot_store::SqliteStore;
use copilot_telemetry::Paths;

use crate::services::Services;
use crate::settings::Settings;

/// Resolved data directory and settings shared by every command
pub struct Context {
    pub paths: Paths,
    pub settings: Settings,
}

impl Context {
    pub fn load(config: Option<&Path>) -> anyhow::Result<Self> {
        let paths = Paths::new()?;
        let settings = Settings::load(config, &paths)?;
        Ok(Self { paths, settings })
    }

    /// Open the configured database and wire the core services over it
    pub fn open_store(&self) -> anyhow::Result<Arc<SqliteStore>> {
        let db_path = self.settings.database_path(&self.paths);
        tracing::debug!(path = %db_path.display(), "opening database");
        Ok(Arc::new(SqliteStore::open(&db_path)?))
    }

    pub fn services(&self) -> anyhow::Result<Services> {
        let store = self.open_store()?;
        Ok(Services::new(
            store,
            Arc::new(SystemClock),
            &self.settings.core,
        ))
    }
}
