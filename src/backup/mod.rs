pub(crate) mod db_dump; // Invocation of the external dump tool
pub(crate) mod run_log; // Per-run text log
mod run;

use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::notify::{Notifier, Report};
use db_dump::{DumpCommand, DumpOutcome, DumpStatus};
use run_log::RunLog;

pub use run::RunStamp;

/// Exit status accumulated across the batch. The first non-zero dump status is
/// kept; later statuses never overwrite it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatus(u8);

impl RunStatus {
    pub fn record(&mut self, status: &DumpStatus) {
        if self.0 == 0 {
            self.0 = status.exit_code();
        }
    }

    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn is_success(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseResult {
    pub name: String,
    pub outcome: DumpOutcome,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stamp: RunStamp,
    pub backup_dir: PathBuf,
    pub log_path: PathBuf,
    pub status: RunStatus,
    pub results: Vec<DatabaseResult>,
}

/// Creates `<backup root>/Backup <stamp>`. Failure here is fatal to the run.
pub fn prepare_backup_dir(config: &AppConfig, stamp: &RunStamp) -> Result<PathBuf> {
    let backup_dir = stamp.backup_dir(&config.backup_root);
    fs::create_dir_all(&backup_dir).map_err(|e| AppError::filesystem(&backup_dir, e))?;
    info!("📂 Backup directory created at: {}", backup_dir.display());
    Ok(backup_dir)
}

/// Runs the whole backup: folder, one dump per database in configured order,
/// one log line each, then the emailed report.
pub async fn run_backup_flow<N: Notifier>(
    config: &AppConfig,
    stamp: RunStamp,
    notifier: &N,
) -> Result<RunSummary> {
    let backup_dir = prepare_backup_dir(config, &stamp)?;
    let log = RunLog::create(&stamp.log_path(&config.log_root))?;
    let dumper = DumpCommand::from_config(config);

    let mut status = RunStatus::default();
    let mut results = Vec::with_capacity(config.databases.len());

    for db_name in &config.databases {
        println!("Backing up {}.", db_name);

        let dest = backup_dir.join(format!("{}.sql", db_name));
        let outcome = dumper.dump_to(db_name, &dest).await;

        log.append(db_name, &outcome)?;
        status.record(&outcome.status);
        if outcome.status != DumpStatus::Success {
            warn!("Dump of {} finished with {:?}", db_name, outcome.status);
        }

        results.push(DatabaseResult {
            name: db_name.clone(),
            outcome,
        });
    }

    let log_text = log.read()?;
    let report = Report::compose(&stamp, status.code(), &log_text, &backup_dir, log.path());
    match notifier.notify(&report).await {
        Ok(()) => info!("Report sent: {}", report.subject),
        Err(e) => warn!("Could not send backup report: {}", e),
    }

    Ok(RunSummary {
        stamp,
        log_path: log.path().to_path_buf(),
        backup_dir,
        status,
        results,
    })
}
