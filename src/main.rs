use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use webserver::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    match args.get_command() {
        cli::Commands::Start => {
            let cfg = config::load_config(&args.config)?;
            init_tracing(&cfg.server.log_level, cfg.server.log_format == "json");
            commands::start::execute(cfg).await?;
        }
        cli::Commands::Test => commands::test::execute(&args.config)?,
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Version => {
            println!("webserver v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
