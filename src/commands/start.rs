use anyhow::Result;
use colored::Colorize;
use tracing::info;
use webserver::{config::Config, server};

/// Execute the start command
pub async fn execute(cfg: Config) -> Result<()> {
    println!("{}", "Starting webserver...".green());
    info!(
        host = %cfg.server.host,
        port = cfg.server.port,
        "Starting webserver in foreground mode"
    );

    // Blocks until shutdown
    server::start_server(cfg).await
}
