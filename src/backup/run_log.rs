// mysqlbackup/src/backup/run_log.rs
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::db_dump::DumpOutcome;
use crate::errors::{AppError, Result};

pub const LOG_HEADER: &str = "MySQL_Backup\n============\n\n";

/// Append-only text record of a run. Each append opens and closes the file,
/// so the lines written so far survive a crash mid-run.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

/// One result line: `<name> (<size> bytes)` plus the status suffix.
pub fn format_line(db_name: &str, outcome: &DumpOutcome) -> String {
    format!("{} ({} bytes){}", db_name, outcome.bytes, outcome.status.log_suffix())
}

impl RunLog {
    /// Creates (or truncates) the log and writes the header.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AppError::filesystem(parent, e))?;
        }

        let mut file = File::create(path).map_err(|e| AppError::filesystem(path, e))?;
        file.write_all(LOG_HEADER.as_bytes())
            .map_err(|e| AppError::filesystem(path, e))?;

        Ok(RunLog {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, db_name: &str, outcome: &DumpOutcome) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::filesystem(&self.path, e))?;
        writeln!(file, "{}", format_line(db_name, outcome))
            .map_err(|e| AppError::filesystem(&self.path, e))
    }

    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| AppError::filesystem(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::db_dump::DumpStatus;

    fn outcome(status: DumpStatus, bytes: u64) -> DumpOutcome {
        DumpOutcome { status, bytes }
    }

    #[test]
    fn lines_carry_size_and_suffix() {
        assert_eq!(format_line("db1", &outcome(DumpStatus::Success, 500)), "db1 (500 bytes)");
        assert_eq!(
            format_line("db2", &outcome(DumpStatus::Warning, 12)),
            "db2 (12 bytes) ... WARNING"
        );
        assert_eq!(
            format_line("db3", &outcome(DumpStatus::NotFound, 0)),
            "db3 (0 bytes) ... DATABASE NOT FOUND"
        );
        assert_eq!(
            format_line("db4", &outcome(DumpStatus::Unknown(Some(5)), 7)),
            "db4 (7 bytes) ... UNKNOWN ERROR"
        );
    }

    #[test]
    fn log_has_header_then_lines_in_append_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let log = RunLog::create(&dir.path().join("logs").join("Backup 20240101_000000.txt"))?;

        log.append("zeta", &outcome(DumpStatus::Success, 10))?;
        log.append("alpha", &outcome(DumpStatus::NotFound, 0))?;

        assert_eq!(
            log.read()?,
            "MySQL_Backup\n============\n\nzeta (10 bytes)\nalpha (0 bytes) ... DATABASE NOT FOUND\n"
        );
        Ok(())
    }

    #[test]
    fn create_truncates_an_existing_log() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("Backup.txt");
        fs::write(&path, "old contents\n")?;

        let log = RunLog::create(&path)?;
        assert_eq!(log.read()?, LOG_HEADER);
        Ok(())
    }

    #[test]
    fn append_to_vanished_log_is_a_filesystem_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("Backup.txt");
        let log = RunLog::create(&path)?;
        fs::remove_file(&path)?;

        let err = log.append("db1", &outcome(DumpStatus::Success, 1)).unwrap_err();
        assert!(matches!(err, AppError::Filesystem { .. }));
        Ok(())
    }
}
