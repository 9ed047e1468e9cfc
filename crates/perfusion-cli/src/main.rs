mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "perfusion", about = "Perfusion series registration and time-to-peak mapping")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register every group under a directory and render time-to-peak maps
    Run(commands::run::RunArgs),
    /// Segment a single image
    Segment(commands::segment::SegmentArgs),
    /// Two-stage registration of one moving image onto a fixed image
    Register(commands::register::RegisterArgs),
    /// Print or save the default pipeline configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Segment(args) => commands::segment::run(args),
        Commands::Register(args) => commands::register::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
