//! `calcgrid agent` — Start a worker agent.

use calcgrid_config::AppConfig;
use calcgrid_worker::Worker;

pub async fn run(
    server: Option<String>,
    computing_power: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut agent = AppConfig::load_agent().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(server) = server {
        agent.server_url = server;
    }
    if let Some(power) = computing_power {
        agent.computing_power = power;
    }

    let worker = Worker::from_config(&agent)?;

    println!("🧮 calcgrid agent");
    println!("   Server:          {}", agent.server_url);
    println!("   Computing power: {}", worker.computing_power());
    println!("   Poll interval:   {}ms", agent.poll_interval_ms);
    println!("   Press Ctrl+C to stop");

    worker
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    Ok(())
}
