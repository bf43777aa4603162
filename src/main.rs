use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use planweaver::presentation::cli::{Cli, Commands};
use planweaver::web::config::AppConfig;
use planweaver::web::server::start_web_server;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("planweaver=debug,info")
    } else {
        EnvFilter::new("planweaver=info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            database,
        } => {
            // Fatal on missing required secrets in production (exit code 1)
            let config = AppConfig::from_env()?
                .with_host(host)
                .with_port(port)
                .with_database_path(database);

            start_web_server(config).await?;
        }
    }

    Ok(())
}
