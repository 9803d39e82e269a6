//! MySQL Backup Runner
//!
//! Dumps every configured database with mysqldump into a timestamped folder,
//! writes a run log and mails it.

// mysqlbackup/src/main.rs
mod backup;
mod config;
mod errors;
mod notify;
mod utils;

use anyhow::{Context, Result};
use backup::db_dump::DumpStatus;
use backup::{RunStamp, RunSummary};
use config::{AppConfig, CONFIG_PATH_ENV, resolve_config_path};
use errors::AppError;
use notify::SmtpNotifier;
use std::env;
use std::process::ExitCode;
use tracing::{error, info};

/// Main entry point for the backup runner
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    utils::init_logging();

    println!("MySQL_Backup");
    println!("============");
    println!();

    match run_app().await {
        Ok(summary) => {
            println!();
            println!("Backups complete.");
            if summary.status.is_success() {
                info!("✅ All {} databases backed up to {}", summary.results.len(), summary.backup_dir.display());
            } else {
                for failed in summary.results.iter().filter(|r| r.outcome.status != DumpStatus::Success) {
                    error!("{} -> {:?}", failed.name, failed.outcome.status);
                }
                error!(
                    "❌ Run {} finished with errors (exit status {}). See {}",
                    summary.stamp,
                    summary.status.code(),
                    summary.log_path.display()
                );
            }
            ExitCode::from(summary.status.code())
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Exit status for a run that stopped on an error, looking through any `.context` layers.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<AppError>()
        .map(AppError::exit_code)
        .unwrap_or(errors::EXIT_FATAL)
}

async fn run_app() -> Result<RunSummary> {
    let config_path = resolve_config_path(env::args().nth(1), env::var(CONFIG_PATH_ENV).ok());
    let app_config = AppConfig::load_from_json(&config_path)
        .context(format!("Failed to load application configuration from {}", config_path.display()))?;

    info!(
        "🚀 Starting backup of {} databases on {}",
        app_config.databases.len(),
        app_config.database.host
    );

    let notifier = SmtpNotifier::new(app_config.smtp.clone());
    let summary = backup::run_backup_flow(&app_config, RunStamp::now(), &notifier)
        .await
        .context("Backup process failed")?;
    Ok(summary)
}
