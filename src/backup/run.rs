// mysqlbackup/src/backup/run.rs
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::path::{Path, PathBuf};

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Identifies one execution of the runner. Names both the backup folder and the log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp(String);

impl RunStamp {
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn from_datetime(at: NaiveDateTime) -> Self {
        RunStamp(at.format(STAMP_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<root>/Backup <stamp>`
    pub fn backup_dir(&self, backup_root: &Path) -> PathBuf {
        backup_root.join(format!("Backup {}", self.0))
    }

    /// `<root>/Backup <stamp>.txt`
    pub fn log_path(&self, log_root: &Path) -> PathBuf {
        log_root.join(format!("Backup {}.txt", self.0))
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2013, 10, 8)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .expect("valid date")
    }

    #[test]
    fn stamp_uses_compact_date_and_time() {
        assert_eq!(RunStamp::from_datetime(at(7, 5, 9)).as_str(), "20131008_070509");
    }

    #[test]
    fn paths_are_derived_from_stamp() {
        let stamp = RunStamp::from_datetime(at(23, 59, 1));
        assert_eq!(
            stamp.backup_dir(Path::new("/srv/backups")),
            PathBuf::from("/srv/backups/Backup 20131008_235901")
        );
        assert_eq!(
            stamp.log_path(Path::new("/srv/logs")),
            PathBuf::from("/srv/logs/Backup 20131008_235901.txt")
        );
    }

    #[test]
    fn now_has_the_expected_shape() {
        let stamp = RunStamp::now();
        let text = stamp.as_str();
        assert_eq!(text.len(), 15);
        assert_eq!(&text[8..9], "_");
        assert!(text.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }
}
