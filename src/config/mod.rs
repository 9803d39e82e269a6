// mysqlbackup/src/config/mod.rs
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use which::which;

use crate::errors::{AppError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "MYSQL_BACKUP_CONFIG";
pub const DB_PASSWORD_ENV: &str = "MYSQL_BACKUP_DB_PASSWORD";
pub const SMTP_PASSWORD_ENV: &str = "MYSQL_BACKUP_SMTP_PASSWORD";
const DEFAULT_DUMP_TOOL: &str = "mysqldump";
const SMTPS_PORT: u16 = 465;

/// Placeholder printed instead of secrets in `Debug` output.
pub const REDACTED: &str = "<redacted>";

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonDumpToolConfig {
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Clone, Default, Deserialize)]
pub struct JsonDatabaseServer {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Default, Deserialize)]
pub struct JsonSmtpConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<SmtpTls>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub dump_tool: Option<JsonDumpToolConfig>,
    pub backup_root: Option<PathBuf>,
    pub log_root: Option<PathBuf>,
    pub database: Option<JsonDatabaseServer>,
    pub smtp: Option<JsonSmtpConfig>,
    pub databases: Option<Vec<String>>,
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct DumpToolConfig {
    pub path: PathBuf,
    pub extra_args: Vec<String>,
}

#[derive(Clone)]
pub struct DatabaseServer {
    pub host: String,
    pub user: String,
    pub password: String,
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// TLS from the first byte (SMTPS, port 465).
    Wrapper,
    /// Plain connection upgraded with STARTTLS (submission, port 587).
    Starttls,
    /// No encryption.
    None,
}

impl SmtpTls {
    /// Used when `smtp.tls` is not set: implicit TLS on 465 or no port, STARTTLS otherwise.
    pub fn for_port(port: Option<u16>) -> Self {
        match port {
            None | Some(SMTPS_PORT) => SmtpTls::Wrapper,
            Some(_) => SmtpTls::Starttls,
        }
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: Option<u16>,
    pub tls: SmtpTls,
    pub user: String,
    pub password: String,
    pub from: String,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dump_tool: DumpToolConfig,
    pub backup_root: PathBuf,
    pub log_root: PathBuf,
    pub database: DatabaseServer,
    pub smtp: SmtpConfig,
    pub databases: Vec<String>,
}

fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| REDACTED)
}

impl fmt::Debug for JsonDatabaseServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDatabaseServer")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .finish()
    }
}

impl fmt::Debug for JsonSmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .field("from", &self.from)
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl fmt::Debug for DatabaseServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseServer")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .finish()
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .field("from", &self.from)
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Secrets that may be supplied through the environment instead of config.json.
#[derive(Debug, Clone, Default)]
pub struct SecretOverrides {
    pub db_password: Option<String>,
    pub smtp_password: Option<String>,
}

impl SecretOverrides {
    pub fn from_env() -> Self {
        SecretOverrides {
            db_password: env::var(DB_PASSWORD_ENV).ok(),
            smtp_password: env::var(SMTP_PASSWORD_ENV).ok(),
        }
    }
}

/// Picks the config file: explicit argument, then `MYSQL_BACKUP_CONFIG`, then `config.json`.
/// `from_env` is the value of `MYSQL_BACKUP_CONFIG`, if set.
pub fn resolve_config_path(arg: Option<String>, from_env: Option<String>) -> PathBuf {
    arg.filter(|a| !a.trim().is_empty())
        .or_else(|| from_env.filter(|p| !p.trim().is_empty()))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            ))
        })?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)?;

        info!("Loaded configuration from {}", config_path.display());
        Self::from_raw(raw_json_config, SecretOverrides::from_env())
    }

    pub fn from_raw(raw: RawJsonConfig, secrets: SecretOverrides) -> Result<Self> {
        let backup_root = required_path(raw.backup_root, "backup_root")?;
        let log_root = required_path(raw.log_root, "log_root")?;

        let db = raw.database.unwrap_or_default();
        let database = DatabaseServer {
            host: required(db.host, "database.host")?,
            user: required(db.user, "database.user")?,
            password: resolve_secret(db.password, secrets.db_password, "database.password", DB_PASSWORD_ENV)?,
        };

        let smtp_raw = raw.smtp.unwrap_or_default();
        let smtp_user = required(smtp_raw.user, "smtp.user")?;
        let smtp = SmtpConfig {
            host: required(smtp_raw.host, "smtp.host")?,
            port: smtp_raw.port,
            tls: smtp_raw.tls.unwrap_or_else(|| SmtpTls::for_port(smtp_raw.port)),
            password: resolve_secret(smtp_raw.password, secrets.smtp_password, "smtp.password", SMTP_PASSWORD_ENV)?,
            from: smtp_raw
                .from
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| smtp_user.clone()),
            recipient: required(smtp_raw.recipient, "smtp.recipient")?,
            user: smtp_user,
        };

        let tool = raw.dump_tool.unwrap_or_default();
        let dump_tool = DumpToolConfig {
            path: match tool.path.filter(|p| !p.as_os_str().is_empty()) {
                Some(path) => path,
                None => find_dump_executable()?,
            },
            extra_args: tool.extra_args,
        };

        let databases = validate_database_list(raw.databases)?;

        Ok(AppConfig {
            dump_tool,
            backup_root,
            log_root,
            database,
            smtp,
            databases,
        })
    }
}

/// Finds the mysqldump executable in the system PATH.
fn find_dump_executable() -> Result<PathBuf> {
    let path = which(DEFAULT_DUMP_TOOL).map_err(|_| {
        AppError::Config(
            "dump_tool.path is not set and mysqldump was not found in PATH. Please install the MySQL client tools or set dump_tool.path in config.json.".to_string(),
        )
    })?;
    debug!("Found mysqldump executable at: {}", path.display());
    Ok(path)
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    value
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} must be set in config.json", key)))
}

fn required_path(value: Option<PathBuf>, key: &str) -> Result<PathBuf> {
    value
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} must be set in config.json", key)))
}

/// The value in config.json wins; the environment variable fills the gap.
fn resolve_secret(from_file: Option<String>, from_env: Option<String>, key: &str, env_key: &str) -> Result<String> {
    from_file
        .filter(|s| !s.is_empty())
        .or(from_env.filter(|s| !s.is_empty()))
        .ok_or_else(|| {
            AppError::Config(format!(
                "{} must be set in config.json or through the {} environment variable",
                key, env_key
            ))
        })
}

/// Database names become file names, so they must be usable as one.
fn validate_database_list(databases: Option<Vec<String>>) -> Result<Vec<String>> {
    let databases = databases
        .filter(|dbs| !dbs.is_empty())
        .ok_or_else(|| AppError::Config("databases must list at least one database in config.json".to_string()))?;

    let mut seen = HashSet::new();
    for name in &databases {
        if name.trim().is_empty() {
            return Err(AppError::Config("databases contains an empty name".to_string()));
        }
        if name.contains(|c: char| c == '/' || c == '\\' || c == '\0') || name == "." || name == ".." {
            return Err(AppError::Config(format!(
                "Invalid database name '{}': names are used as file names and cannot contain path separators",
                name
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(AppError::Config(format!("Database '{}' is listed more than once", name)));
        }
    }

    Ok(databases)
}
