//! `calcgrid config` — Configuration management commands.

use calcgrid_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");
            config
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };

    match config.operation_limits() {
        Ok(limits) => {
            println!("   ✅ Operation time limits set");
            println!();
            println!("   Addition:       {:?}", limits.addition);
            println!("   Subtraction:    {:?}", limits.subtraction);
            println!("   Multiplication: {:?}", limits.multiplication);
            println!("   Division:       {:?}", limits.division);
        }
        Err(e) => println!("   ⚠️  {e} (required by the orchestrator)"),
    }

    println!();
    println!(
        "   Gateway:   {}:{}",
        config.gateway.host, config.gateway.port
    );
    println!("   Server:    {}", config.agent.server_url);
    println!("   Power:     {}", config.agent.computing_power);

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}
