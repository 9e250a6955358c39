pub fn run() -> anyhow::Result<()> {
    println!("copilot-dashboard {}", env!("CARGO_PKG_VERSION"));
    println!("Rollups, contribution series and live connections for Co-Pilot agents");
    Ok(())
}
