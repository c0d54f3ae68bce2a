mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, record::RecordArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cmdflow",
    about = "Learn recurring slash-command workflows from execution history",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .cmdflow/ or .git/)
    #[arg(long, global = true, env = "CMDFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize cmdflow in the current project
    Init,

    /// Record a finished command execution
    Record(RecordArgs),

    /// Detect recurring command sequences in a time window
    Detect {
        /// Lookback window such as 30m, 12h, 7d or 2w (default from config)
        #[arg(long, short = 'w')]
        window: Option<String>,
    },

    /// Suggest what usually comes next after the given commands
    Suggest {
        /// Recently run commands, oldest first (comma-separated)
        #[arg(long, value_delimiter = ',')]
        recent: Vec<String>,

        /// Command currently being run
        #[arg(long)]
        current: Option<String>,
    },

    /// Check whether a command sequence is a known frequent pattern
    Check {
        /// Commands, oldest first
        #[arg(required = true)]
        commands: Vec<String>,
    },

    /// Show error pairs, time peaks and workflow recommendations
    Insights,

    /// Inspect or validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Record(args) => cmd::record::run(&root, args, cli.json),
        Commands::Detect { window } => cmd::detect::run(&root, window.as_deref(), cli.json),
        Commands::Suggest { recent, current } => {
            cmd::suggest::run(&root, recent, current, cli.json)
        }
        Commands::Check { commands } => cmd::check::run(&root, commands, cli.json),
        Commands::Insights => cmd::insights::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
