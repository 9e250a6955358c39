//! Path resolution for the dashboard data directory

use std::path::PathBuf;

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "COPILOT_DASHBOARD_HOME";

/// Resolves standard paths for dashboard files
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Paths {
    /// Resolve the data directory from `$COPILOT_DASHBOARD_HOME`, falling back
    /// to `~/.copilot-dashboard`
    pub fn new() -> std::io::Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(dir));
        }

        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;

        Ok(Self::at(home.join(".copilot-dashboard")))
    }

    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Get settings.json path
    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    /// Get the default SQLite database path
    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join("copilot.db")
    }

    /// Get the default static dashboard directory
    pub fn static_dir(&self) -> PathBuf {
        self.data_dir.join("static")
    }
}
