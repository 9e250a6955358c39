//! Application settings loaded from `settings.json`

use std::path::{Path, PathBuf};

use anyhow::Context;
use copilot_core::Config;
use copilot_telemetry::Paths;
use serde::{Deserialize, Serialize};

/// Where the Graphite web interface lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphiteSettings {
    pub host: String,
    pub port: u16,
}

impl Default for GraphiteSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl GraphiteSettings {
    pub fn render_url(&self) -> String {
        format!("http://{}:{}/render/", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    /// SQLite database; defaults to `copilot.db` in the data directory
    pub database: Option<PathBuf>,

    pub graphite: GraphiteSettings,

    /// Directory served under `/dashboard/`
    pub static_dir: Option<PathBuf>,

    pub enable_cors: bool,

    /// Rollup and connection tunables
    pub core: Config,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database: None,
            graphite: GraphiteSettings::default(),
            static_dir: None,
            enable_cors: false,
            core: Config::default(),
        }
    }
}

impl Settings {
    /// Load settings from `explicit`, else from the data directory's
    /// `settings.json`, else defaults. Only an explicit path must exist.
    pub fn load(explicit: Option<&Path>, paths: &Paths) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = paths.settings_file();
                if !path.exists() {
                    tracing::debug!(path = %path.display(), "no settings file, using defaults");
                    return Ok(Self::default());
                }
                path
            }
        };

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing settings from {}", path.display()))
    }

    pub fn database_path(&self, paths: &Paths) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| paths.database_file())
    }
}
