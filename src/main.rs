//! Context Tracker - durable project knowledge from Claude Code sessions.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use context_tracker::config::ConfigLoader;
use context_tracker::hooks::{HookOutput, StopHook};
use context_tracker::wiki::{
    merge_session, parse_bytes, render, KnowledgeDocument, MergeError, SessionContext,
    DEFAULT_MAX_RECENT,
};

#[derive(Parser)]
#[command(
    name = "context-tracker",
    about = "Turn Claude Code sessions into project knowledge",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a Stop hook event read from stdin.
    Stop {
        /// Config file to use instead of the default search paths.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Merge a session context into a wiki file and print the result.
    Merge {
        /// Existing context.md (may be missing).
        #[arg(long)]
        wiki: PathBuf,
        /// Session context as JSON.
        #[arg(long)]
        session: PathBuf,
        /// Entries kept in Recent Work.
        #[arg(long, default_value_t = DEFAULT_MAX_RECENT, allow_negative_numbers = true)]
        max_recent: i64,
    },
}

#[derive(Debug, thiserror::Error)]
enum MergeCommandError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid session JSON: {0}")]
    Session(#[from] serde_json::Error),
    #[error(transparent)]
    Merge(#[from] MergeError),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Stop hook entry point. Always succeeds; failures go into the reply.
async fn stop(config: Option<PathBuf>) -> HookOutput {
    let loader = config.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            return HookOutput::error(e);
        }
    };

    let mut raw = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut raw).await {
        tracing::error!(error = %e, "Failed to read hook input");
        return HookOutput::error(e);
    }

    StopHook::from_config(config).handle_json(&raw).await
}

async fn merge(wiki: &Path, session: &Path, max_recent: i64) -> Result<String, MergeCommandError> {
    let doc = match tokio::fs::read(wiki).await {
        Ok(bytes) => parse_bytes(&bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => KnowledgeDocument::default(),
        Err(source) => {
            return Err(MergeCommandError::Read {
                path: wiki.to_path_buf(),
                source,
            })
        }
    };

    let session_json =
        tokio::fs::read_to_string(session)
            .await
            .map_err(|source| MergeCommandError::Read {
                path: session.to_path_buf(),
                source,
            })?;
    let session: SessionContext = serde_json::from_str(&session_json)?;

    let merged = merge_session(&doc, &session, max_recent)?;
    Ok(render(&merged))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Stop { config } => {
            println!("{}", stop(config).await.to_json());
            ExitCode::SUCCESS
        }
        Commands::Merge {
            wiki,
            session,
            max_recent,
        } => match merge(&wiki, &session, max_recent).await {
            Ok(rendered) => {
                print!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("context-tracker: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
