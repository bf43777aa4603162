use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "planweaver")]
#[command(author = "PlanWeaver Team")]
#[command(version = "0.1.0")]
#[command(about = "Dependency-aware scheduling engine for GitHub Projects", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Start the scheduling engine's HTTP server")]
    Serve {
        #[arg(long, default_value = "0.0.0.0", help = "Host address to bind")]
        host: String,

        #[arg(short, long, default_value = "8080", help = "Port to listen on")]
        port: u16,

        #[arg(
            short,
            long,
            value_name = "FILE",
            default_value = "planweaver.db",
            help = "SQLite database file"
        )]
        database: String,
    },
}
