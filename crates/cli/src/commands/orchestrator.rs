//! `calcgrid orchestrator` — Start the HTTP API server.

use calcgrid_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let limits = config.operation_limits()?;

    println!("🧮 calcgrid orchestrator");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Limits:    + {:?}  - {:?}  * {:?}  / {:?}",
        limits.addition, limits.subtraction, limits.multiplication, limits.division
    );

    calcgrid_gateway::start(config).await?;

    Ok(())
}
