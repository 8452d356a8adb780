use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracklab_core::Config;

mod commands;

#[derive(Parser)]
#[command(name = "tracklab", version, about = "Tracklab self-experiment CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse variable kinds
    Catalog {
        #[command(subcommand)]
        action: commands::catalog::CatalogAction,
    },
    /// Project and variable management
    Project {
        #[command(subcommand)]
        action: commands::project::ProjectAction,
    },
    /// Record a measurement cycle
    Cycle {
        #[command(subcommand)]
        action: commands::cycle::CycleAction,
    },
    /// Inspect and deliver queued records
    Queue {
        #[command(subcommand)]
        action: commands::queue::QueueAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays parseable.
fn init_logging() {
    let level = Config::load_or_default().log.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Catalog { action } => commands::catalog::run(action),
        Commands::Project { action } => commands::project::run(action),
        Commands::Cycle { action } => commands::cycle::run(action),
        Commands::Queue { action } => commands::queue::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
