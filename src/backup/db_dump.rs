// mysqlbackup/src/backup/db_dump.rs
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, REDACTED};
use crate::errors::{AppError, Result};

/// How one dump invocation ended, read from the tool's exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpStatus {
    Success,
    Warning,
    NotFound,
    /// Any other status. `None` when the tool was killed by a signal or never ran.
    Unknown(Option<i32>),
}

impl DumpStatus {
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => DumpStatus::Success,
            Some(1) => DumpStatus::Warning,
            Some(2) => DumpStatus::NotFound,
            other => DumpStatus::Unknown(other),
        }
    }

    /// Contribution to the process exit status; 0 only for success.
    pub fn exit_code(&self) -> u8 {
        match self {
            DumpStatus::Success => 0,
            DumpStatus::Warning => 1,
            DumpStatus::NotFound => 2,
            DumpStatus::Unknown(Some(code)) if (1..=255).contains(code) => *code as u8,
            DumpStatus::Unknown(_) => 255,
        }
    }

    /// Suffix appended to the database's log line.
    pub fn log_suffix(&self) -> &'static str {
        match self {
            DumpStatus::Success => "",
            DumpStatus::Warning => " ... WARNING",
            DumpStatus::NotFound => " ... DATABASE NOT FOUND",
            DumpStatus::Unknown(_) => " ... UNKNOWN ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOutcome {
    pub status: DumpStatus,
    pub bytes: u64,
}

/// Invocation of the external dump tool: arguments in, exit status and stdout out.
#[derive(Clone)]
pub struct DumpCommand {
    program: PathBuf,
    extra_args: Vec<String>,
    host: String,
    user: String,
    password: String,
}

impl fmt::Debug for DumpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumpCommand")
            .field("program", &self.program)
            .field("extra_args", &self.extra_args)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .finish()
    }
}

impl DumpCommand {
    pub fn new(
        program: impl Into<PathBuf>,
        extra_args: Vec<String>,
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        DumpCommand {
            program: program.into(),
            extra_args,
            host: host.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.dump_tool.path,
            config.dump_tool.extra_args.clone(),
            &config.database.host,
            &config.database.user,
            &config.database.password,
        )
    }

    /// Full argument list; the database name is always last.
    pub fn args(&self, db_name: &str) -> Vec<String> {
        let mut args = self.extra_args.clone();
        args.push(format!("--host={}", self.host));
        args.push(format!("--user={}", self.user));
        args.push(format!("--password={}", self.password));
        args.push("--default-character-set=utf8".to_string());
        args.push(db_name.to_string());
        args
    }

    /// Dumps `db_name` into `dest`, truncating it first.
    ///
    /// Never fails: launch and write errors are reported as `Unknown(None)` so the
    /// batch can move on to the next database.
    pub async fn dump_to(&self, db_name: &str, dest: &Path) -> DumpOutcome {
        let status = match self.run(db_name, dest).await {
            Ok(status) => status,
            Err(e) => {
                error!("Dump of {} could not complete: {}", db_name, e);
                DumpStatus::Unknown(None)
            }
        };

        let bytes = match fs::metadata(dest).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        info!("Dumped {} to {} ({} bytes, {:?})", db_name, dest.display(), bytes, status);
        DumpOutcome { status, bytes }
    }

    async fn run(&self, db_name: &str, dest: &Path) -> Result<DumpStatus> {
        let mut file = File::create(dest)
            .await
            .map_err(|e| AppError::filesystem(dest, e))?;

        debug!(
            "Running {} --host={} --user={} --default-character-set=utf8 {}",
            self.program.display(),
            self.host,
            self.user,
            db_name
        );

        let mut child = Command::new(&self.program)
            .args(self.args(db_name))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| AppError::Command(format!("Failed to launch {}: {}", self.program.display(), e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Command("dump tool stdout was not captured".to_string()))?;

        let copied = async {
            tokio::io::copy(&mut stdout, &mut file).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = copied {
            // Nobody reads the pipe any more; stop the tool instead of waiting on a blocked writer.
            drop(stdout);
            if let Err(kill_err) = child.kill().await {
                warn!("Could not stop {} after a write failure: {}", self.program.display(), kill_err);
            }
            return Err(AppError::filesystem(dest, e));
        }

        let exit = child.wait().await?;

        Ok(DumpStatus::from_exit_code(exit.code()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(program: &str, extra: Vec<String>) -> DumpCommand {
        DumpCommand::new(program, extra, "dbserver", "dbuser", "dbpassword")
    }

    #[test]
    fn exit_codes_map_to_statuses() {
        assert_eq!(DumpStatus::from_exit_code(Some(0)), DumpStatus::Success);
        assert_eq!(DumpStatus::from_exit_code(Some(1)), DumpStatus::Warning);
        assert_eq!(DumpStatus::from_exit_code(Some(2)), DumpStatus::NotFound);
        assert_eq!(DumpStatus::from_exit_code(Some(3)), DumpStatus::Unknown(Some(3)));
        assert_eq!(DumpStatus::from_exit_code(None), DumpStatus::Unknown(None));
    }

    #[test]
    fn statuses_have_log_suffixes_and_exit_codes() {
        assert_eq!(DumpStatus::Success.log_suffix(), "");
        assert_eq!(DumpStatus::Success.exit_code(), 0);
        assert_eq!(DumpStatus::Warning.log_suffix(), " ... WARNING");
        assert_eq!(DumpStatus::NotFound.log_suffix(), " ... DATABASE NOT FOUND");
        assert_eq!(DumpStatus::Unknown(Some(6)).log_suffix(), " ... UNKNOWN ERROR");
        assert_eq!(DumpStatus::Unknown(Some(6)).exit_code(), 6);
        assert_eq!(DumpStatus::Unknown(Some(-1)).exit_code(), 255);
        assert_eq!(DumpStatus::Unknown(None).exit_code(), 255);
    }

    #[test]
    fn database_name_is_the_last_argument() {
        let cmd = command("mysqldump", vec!["--single-transaction".into()]);
        assert_eq!(
            cmd.args("db1"),
            vec![
                "--single-transaction",
                "--host=dbserver",
                "--user=dbuser",
                "--password=dbpassword",
                "--default-character-set=utf8",
                "db1",
            ]
        );
    }

    #[tokio::test]
    async fn missing_tool_is_recorded_as_unknown() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("db1.sql");
        let cmd = command("/definitely/not/a/dump/tool", vec![]);

        let outcome = cmd.dump_to("db1", &dest).await;
        assert_eq!(outcome.status, DumpStatus::Unknown(None));
        assert_eq!(outcome.bytes, 0);
        Ok(())
    }

    #[tokio::test]
    async fn unwritable_destination_is_recorded_as_unknown() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("missing-folder").join("db1.sql");
        let cmd = command("/bin/sh", vec!["-c".into(), "exit 0".into()]);

        let outcome = cmd.dump_to("db1", &dest).await;
        assert_eq!(outcome.status, DumpStatus::Unknown(None));
        assert_eq!(outcome.bytes, 0);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_written_verbatim_and_status_is_read() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("db1.sql");
        // `sh -c script name args...` ignores the trailing connection arguments.
        let cmd = command(
            "/bin/sh",
            vec!["-c".into(), "printf 'CREATE TABLE t;\\n'; exit 1".into(), "mysqldump".into()],
        );

        let outcome = cmd.dump_to("db1", &dest).await;
        assert_eq!(outcome.status, DumpStatus::Warning);
        assert_eq!(std::fs::read_to_string(&dest)?, "CREATE TABLE t;\n");
        assert_eq!(outcome.bytes, 16);
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn write_failure_stops_the_tool_and_is_recorded() -> anyhow::Result<()> {
        let cmd = command(
            "/bin/sh",
            vec![
                "-c".into(),
                "yes CREATE_TABLE_LINE | head -c 10000000; exit 0".into(),
                "mysqldump".into(),
            ],
        );

        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            cmd.dump_to("db1", Path::new("/dev/full")),
        )
        .await
        .map_err(|_| anyhow::anyhow!("dump_to did not return after the destination filled up"))?;

        assert_eq!(outcome.status, DumpStatus::Unknown(None));
        assert_eq!(outcome.bytes, 0);
        Ok(())
    }

    #[test]
    fn debug_output_hides_the_password() {
        let cmd = command("mysqldump", vec![]);
        let text = format!("{:?}", cmd);
        assert!(text.contains("dbuser"));
        assert!(!text.contains("dbpassword"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn existing_file_is_truncated() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("db1.sql");
        std::fs::write(&dest, "stale dump contents from an earlier run")?;
        let cmd = command("/bin/sh", vec!["-c".into(), "exit 0".into(), "mysqldump".into()]);

        let outcome = cmd.dump_to("db1", &dest).await;
        assert_eq!(outcome.status, DumpStatus::Success);
        assert_eq!(outcome.bytes, 0);
        assert_eq!(std::fs::metadata(&dest)?.len(), 0);
        Ok(())
    }
}
