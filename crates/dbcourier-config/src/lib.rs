use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// Re-export the dumper settings so callers configure everything in one place
pub use dbcourier_mysql_dumper::MysqlDumperConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub mysql: MysqlDumperConfig,
    pub backup: BackupConfig,
    pub discord: DiscordConfig,
    pub notify: NotifyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory holding the staging dump and archive while a target is
    /// being processed
    pub staging_dir: PathBuf,

    /// YAML document holding the ordered target list
    pub targets_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Webhook receiving the archives; unset makes every transmit fail with
    /// the misconfiguration error
    pub backup_webhook: Option<String>,

    /// Webhook receiving failure and summary embeds; unset silences reports
    pub report_webhook: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyBackend {
    Discord,
    Email,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Which notifier backend to report through
    pub backend: NotifyBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON formatted logs
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mysql: MysqlDumperConfig::default(),
            backup: BackupConfig {
                staging_dir: PathBuf::from("backups"),
                targets_file: PathBuf::from("config/targets.yaml"),
            },
            discord: DiscordConfig {
                backup_webhook: None,
                report_webhook: None,
            },
            notify: NotifyConfig {
                backend: NotifyBackend::Discord,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl AppConfig {
    pub fn load(config_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_dir = config_dir.as_ref();
        let s = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&Self::default())?)
            // Add default.yaml
            .add_source(
                config::File::with_name(&config_dir.join("default.yaml").to_string_lossy())
                    .required(false),
            )
            // Add environment variables (DBC_DISCORD__REPORT_WEBHOOK=...)
            .add_source(config::Environment::with_prefix("DBC").separator("__"))
            .build()?;

        let config = s.try_deserialize()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
