// DocScan - main.rs
//
// Headless entry point. Handles:
// 1. CLI argument parsing
// 2. Platform path resolution and config.toml loading
// 3. Logging initialisation (debug mode support)
// 4. Wiring the artifact store, notification channel and capability into a
//    `SessionController` and running one command against it

use clap::{Parser, Subcommand};
use docscan::app::artifact::{ArtifactStore, FileArtifactStore};
use docscan::app::capability::FileImportCapability;
use docscan::app::controller::SessionController;
use docscan::core::model::ArtifactLocation;
use docscan::core::notify::{NotificationChannel, Subscription};
use docscan::platform::config::{self, AppConfig, PlatformPaths};
use docscan::platform::fs as platform_fs;
use docscan::util::constants::{APP_VERSION, CLI_SESSION_TIMEOUT_SECS};
use docscan::util::error::{ConsumptionError, DocScanError, Result};
use docscan::util::logging;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// DocScan - scan documents into a single persisted PDF.
///
/// Runs one scan session at a time and keeps exactly one "current" document.
#[derive(Parser, Debug)]
#[command(name = "docscan", version, about)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Directory containing config.toml (overrides the platform default).
    #[arg(long = "config-dir", global = true)]
    config_dir: Option<PathBuf>,

    /// Directory for the persisted document (overrides the platform default
    /// and [storage] directory).
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import existing page images and a combined PDF as one scan session.
    Import {
        /// Combined PDF produced for the pages.
        #[arg(short = 'D', long = "document")]
        document: Option<PathBuf>,

        /// Page images, in page order.
        pages: Vec<PathBuf>,
    },

    /// Show where the current document is stored.
    Status,

    /// Open the current document with the system viewer.
    Open,

    /// Show the current document in the system file manager.
    Reveal,
}

fn main() {
    let cli = Cli::parse();

    let paths = PlatformPaths::resolve().with_overrides(cli.config_dir.clone(), None);
    let (mut app_config, config_warnings) = config::load_config(&paths.config_dir);
    if let Some(dir) = cli.data_dir.clone() {
        app_config.storage_dir = Some(dir);
    }

    logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );

    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Configuration warning");
        eprintln!("Warning: {warning}");
    }

    tracing::info!(version = APP_VERSION, debug = cli.debug, "DocScan starting");

    let store = Arc::new(FileArtifactStore::new(
        &app_config.artifact_dir(&paths),
        &app_config.artifact_file_name,
    ));

    let code = match run(cli.command, &app_config, store) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            1
        }
    };
    std::process::exit(code);
}

/// Execute one command. Returns the process exit code.
fn run(command: Command, app_config: &AppConfig, store: Arc<FileArtifactStore>) -> Result<i32> {
    match command {
        Command::Import { document, pages } => {
            let capability = FileImportCapability::new(pages, document);
            let (controller, mut notifications) = build_session(app_config, store, capability);
            run_import(&controller, &mut notifications)
        }
        Command::Status => match store.locate() {
            Some(location) => {
                print_json(&location)?;
                Ok(0)
            }
            None => {
                println!("No scanned document has been saved yet.");
                Ok(1)
            }
        },
        Command::Open => hand_off(app_config, store, platform_fs::open_document),
        Command::Reveal => hand_off(app_config, store, platform_fs::reveal_in_file_manager),
    }
}

/// Construct a controller whose collaborators are all injected here.
fn build_session(
    app_config: &AppConfig,
    store: Arc<FileArtifactStore>,
    capability: FileImportCapability,
) -> (SessionController, Subscription) {
    let controller = SessionController::new(
        store,
        NotificationChannel::new(),
        Arc::new(capability),
        app_config.scanner.clone(),
    );
    // Subscribe before any command runs so no notification is missed.
    let notifications = controller.notifications();
    (controller, notifications)
}

fn run_import(controller: &SessionController, notifications: &mut Subscription) -> Result<i32> {
    if !controller.start_scan() {
        // A fresh controller is never loading; kept for completeness.
        eprintln!("A scan is already in progress.");
        return Ok(1);
    }

    let mut reader = controller.watch();
    let settled = reader.wait_until(
        |state| !state.is_loading,
        Duration::from_secs(CLI_SESSION_TIMEOUT_SECS),
    );
    print_notifications(notifications);

    let Some(state) = settled else {
        eprintln!("Timed out waiting for the scan session to finish.");
        return Ok(2);
    };

    print_json(&*state)?;
    Ok(if state.error_message.is_empty() { 0 } else { 1 })
}

/// Hand the current artifact to an OS helper, reporting failure as a
/// notification the way an interactive front end would show a toast.
fn hand_off(
    app_config: &AppConfig,
    store: Arc<FileArtifactStore>,
    helper: fn(&ArtifactLocation) -> std::result::Result<(), ConsumptionError>,
) -> Result<i32> {
    let location = store.locate();
    let (controller, mut notifications) =
        build_session(app_config, store, FileImportCapability::new(Vec::new(), None));

    let outcome = location
        .ok_or(ConsumptionError::NoArtifact)
        .and_then(|location| helper(&location));

    let code = match outcome {
        Ok(()) => 0,
        Err(e) => {
            controller.publish_notification(platform_fs::open_failure_message(&e));
            1
        }
    };
    print_notifications(&mut notifications);
    Ok(code)
}

fn print_notifications(notifications: &mut Subscription) {
    for message in notifications.drain() {
        eprintln!("{message}");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(std::io::Error::from)
        .and_then(|()| writeln!(out))
        .map_err(|e| DocScanError::Io {
            path: PathBuf::from("<stdout>"),
            operation: "write output",
            source: e,
        })
}
