use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use webserver::config;

/// Execute the config show command
///
/// Displays the effective configuration (file + environment + defaults)
pub fn show(path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());

    let cfg = config::load_config(path)?;

    println!("{}", "Current Configuration:".green().bold());
    println!();
    println!("{}", toml::to_string_pretty(&cfg)?);

    Ok(())
}

/// Execute the config validate command
pub fn validate(path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());

    let cfg = config::load_config(path)?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Listen: {}:{}", cfg.server.host, cfg.server.port);
    println!("  Worker Id: {}", cfg.ids.worker_id);
    println!("  Views: {}", cfg.views.dir.display());

    Ok(())
}
