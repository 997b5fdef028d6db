pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "meshwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cluster metrics cache and live streaming backend for service-mesh dashboards", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run one collection cycle and print the samples")]
    Collect {
        #[arg(short, long, help = "Filter metrics by identifier substring")]
        filter: Option<String>,
    },
    #[command(about = "Run the refresher and stream snapshot frames until interrupted")]
    Watch {
        #[arg(long, default_value_t = 30, help = "Refresh period in seconds")]
        refresh: u64,

        #[arg(long, default_value_t = 5, help = "Frame delivery interval in seconds")]
        interval: u64,
    },
    #[command(about = "List Prometheus scrape targets derived from cluster services")]
    Targets,
    #[command(about = "Show the status of the monitoring services")]
    Status,
    #[command(about = "Show the discovered Prometheus configuration")]
    Config,
}
