use anyhow::Result;
use owo_colors::OwoColorize;

use planner_core::PlannerConfig;

pub fn init() -> Result<()> {
    let config_path = PlannerConfig::config_path()?;

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    PlannerConfig::create_default_config(&config_path)?;

    println!("{}", "Paths".bold());
    println!("  Config:   {}", config_path.display());
    println!(
        "  Session:  {}",
        config_path.with_file_name("session.toml").display()
    );
    println!("\nSet store_url and anon_key, then run `planner signup` or `planner login`.");

    Ok(())
}
