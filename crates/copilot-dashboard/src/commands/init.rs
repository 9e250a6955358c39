use std::path::PathBuf;

use copilot_telemetry::Paths;

use crate::settings::Settings;

pub fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let path = write_defaults(&paths, force)?;
    println!("✓ Wrote default settings to {}", path.display());
    println!("\nNext steps:");
    println!("  - point graphite.host at your Graphite web interface");
    println!("  - copilot-dashboard serve");
    Ok(())
}

fn write_defaults(paths: &Paths, force: bool) -> anyhow::Result<PathBuf> {
    let path = paths.settings_file();
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }

    let json = serde_json::to_string_pretty(&Settings::default())?;
    copilot_telemetry::atomic_write(&path, json.as_bytes())?;
    Ok(path)
}
