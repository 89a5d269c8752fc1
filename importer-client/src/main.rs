//! importer-client - command line front end for site import sessions
//!
//! Runs one coordinator operation and prints every published event to
//! stdout as a JSON line. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use importer_client::{ExportFile, HttpTransport, ImportCoordinator};
use importer_common::config::{ClientConfig, ConfigOverrides};
use importer_common::events::EventBus;
use importer_common::models::{ImporterId, ImporterStatus, ImporterType, SiteId};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for importer-client
#[derive(Parser, Debug)]
#[command(name = "importer-client")]
#[command(about = "Drive site import sessions against the imports API")]
#[command(version)]
struct Args {
    /// API base URL (overrides IMPORTER_API_BASE and the config file)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Bearer token (overrides IMPORTER_ACCESS_TOKEN and the config file)
    #[arg(long, global = true)]
    access_token: Option<String>,

    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List active import sessions of a site
    List {
        #[arg(long)]
        site: SiteId,
    },
    /// Create a local import session
    Start {
        #[arg(long)]
        site: SiteId,
        /// Importer name, e.g. wordpress
        #[arg(long = "type")]
        importer_type: String,
    },
    /// Ask the server to start importing an uploaded session
    Import {
        #[arg(long)]
        site: SiteId,
        #[arg(long)]
        importer: String,
    },
    /// Cancel an import session
    Cancel {
        #[arg(long)]
        site: SiteId,
        #[arg(long)]
        importer: String,
    },
    /// Reset (expire) an import session
    Reset {
        #[arg(long)]
        site: SiteId,
        #[arg(long)]
        importer: String,
    },
    /// Clear an import session
    Clear {
        #[arg(long)]
        site: SiteId,
        #[arg(long)]
        importer: String,
    },
    /// Upload an export file; starts a new session unless --importer is given
    Upload {
        #[arg(long)]
        site: SiteId,
        /// Importer name, required when starting a new session
        #[arg(long = "type", required_unless_present = "importer")]
        importer_type: Option<String>,
        #[arg(long)]
        importer: Option<String>,
        #[arg(long)]
        file: PathBuf,
    },
    /// Map a source author to a target author
    MapAuthor {
        #[arg(long)]
        importer: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ClientConfig::resolve(&ConfigOverrides {
        api_base: args.api_base.clone(),
        access_token: args.access_token.clone(),
        config_path: args.config.clone(),
        log_level: args.log_level.clone(),
    });

    // Initialize tracing (RUST_LOG wins over the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting importer-client v{}", env!("CARGO_PKG_VERSION"));
    info!("API base: {}", config.api_base);

    let transport = HttpTransport::new(&config).context("Failed to build HTTP client")?;
    let event_bus = EventBus::new(config.event_capacity);
    let printer = tokio::spawn(print_events(event_bus.subscribe()));

    let coordinator = ImportCoordinator::new(Arc::new(transport), event_bus);
    let outcome = run(&coordinator, args.command).await;

    // Dropping the last sender lets the printer drain and stop
    drop(coordinator);
    printer.await.context("Event printer failed")?;

    outcome
}

async fn run(coordinator: &ImportCoordinator, command: Command) -> Result<()> {
    match command {
        Command::List { site } => {
            let sessions = coordinator.fetch_all_sessions(site).await;
            info!("{} active import session(s)", sessions.len());
        }
        Command::Start {
            site,
            importer_type,
        } => {
            let session = coordinator.start_session(site, ImporterType::new(&importer_type));
            info!("Local session {}", session.importer_id);
        }
        Command::Import { site, importer } => {
            let status = find_status(coordinator, site, &importer).await?;
            coordinator
                .begin_importing(&status)
                .await
                .context("Start importing task failed")?;
        }
        Command::Cancel { site, importer } => {
            coordinator
                .cancel_session(site, &ImporterId::from(importer))
                .await;
        }
        Command::Reset { site, importer } => {
            coordinator
                .reset_session(site, &ImporterId::from(importer))
                .await;
        }
        Command::Clear { site, importer } => {
            coordinator
                .clear_session(site, &ImporterId::from(importer))
                .await;
        }
        Command::Upload {
            site,
            importer_type,
            importer,
            file,
        } => {
            let status = match importer {
                Some(importer) => find_status(coordinator, site, &importer).await?,
                None => {
                    let importer_type = importer_type
                        .ok_or_else(|| anyhow!("--type is required without --importer"))?;
                    coordinator
                        .start_session(site, ImporterType::new(&importer_type))
                        .to_status()
                }
            };
            let export = ExportFile::from_path(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let upload = coordinator.upload_export_file(&status, export);
            tokio::pin!(upload);

            let uploaded = tokio::select! {
                result = &mut upload => result,
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted, aborting upload");
                    coordinator.abort_upload(&status.importer_id).await;
                    upload.await
                }
            };

            if uploaded.is_none() {
                return Err(anyhow!("Upload of {} failed", file.display()));
            }
        }
        Command::MapAuthor {
            importer,
            source,
            target,
        } => {
            let importer_id = ImporterId::from(importer);
            coordinator.start_author_mapping(&importer_id);
            coordinator.set_author_mapping(&importer_id, &source, &target);
        }
    }

    Ok(())
}

/// Fetch the site's sessions and pick one by id
async fn find_status(
    coordinator: &ImportCoordinator,
    site: SiteId,
    importer: &str,
) -> Result<ImporterStatus> {
    coordinator
        .fetch_all_sessions(site)
        .await
        .into_iter()
        .find(|s| s.importer_id.as_str() == importer)
        .ok_or_else(|| anyhow!("No active import session {} on site {}", importer, site))
}

async fn print_events(mut rx: tokio::sync::broadcast::Receiver<importer_common::ImportEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize {} event: {}", event.event_type(), e),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event printer lagged, {} event(s) skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
