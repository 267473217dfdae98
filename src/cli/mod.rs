pub mod backup;
pub mod docs;
pub mod github;
pub mod track;

use std::path::PathBuf;

use anyhow::Result;
use backup::{process_export_command, process_import_command};
use clap::{Parser, Subcommand};
use docs::{process_docs_command, DocsCommand};
use github::{process_github_command, GithubCommand};
use tracing::level_filters::LevelFilter;
use track::{process_track_command, TrackCommand};

use crate::{
    config::AppConfig,
    github::client::DEFAULT_API_HOST,
    services::Services,
    utils::logging::{enable_logging, CLI_PREFIX},
};

#[derive(Parser, Debug)]
#[command(name = "devdocs", version, long_about = None)]
#[command(about = "Notes and habit tracking with an optional GitHub mirror", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        env = "DEVDOCS_DIR",
        help = "Application directory. By default uses $XDG_STATE_HOME/devdocs or $HOME/.local/state/devdocs"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long = "api-host",
        global = true,
        env = "DEVDOCS_GITHUB_API",
        default_value = DEFAULT_API_HOST,
        help = "Base URL of the GitHub REST API"
    )]
    api_host: String,
    #[arg(long, global = true, help = "Print logs to the console")]
    log: bool,
    #[arg(long = "log-filter", global = true, help = "Log level, overrides RUST_LOG")]
    log_filter: Option<LevelFilter>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Create, read, update and delete documents")]
    Docs {
        #[command(subcommand)]
        command: DocsCommand,
    },
    #[command(about = "Record daily activity and show statistics")]
    Track {
        #[command(subcommand)]
        command: TrackCommand,
    },
    #[command(about = "Configure and use the GitHub mirror")]
    Github {
        #[command(subcommand)]
        command: GithubCommand,
    },
    #[command(about = "Write documents and activities into a JSON backup")]
    Export {
        #[arg(long, help = "Output directory. Defaults to <dir>/backups")]
        out: Option<PathBuf>,
    },
    #[command(about = "Replace documents and activities with the content of a JSON backup")]
    Import { file: PathBuf },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::resolve(args.dir, args.api_host, args.log_filter, args.log)?;
    let log_level = config
        .log_level
        .or(if config.log_to_console { Some(LevelFilter::DEBUG) } else { None });
    enable_logging(CLI_PREFIX, &config.data_dir, log_level, config.log_to_console)?;

    let mut services = Services::open(&config).await?;
    let result = match args.commands {
        Commands::Docs { command } => process_docs_command(command, &mut services).await,
        Commands::Track { command } => process_track_command(command, &mut services).await,
        Commands::Github { command } => process_github_command(command, &mut services).await,
        Commands::Export { out } => {
            process_export_command(out.unwrap_or_else(|| config.backup_dir()), &services).await
        }
        Commands::Import { file } => process_import_command(file, &mut services).await,
    };
    services.shutdown();
    result
}
