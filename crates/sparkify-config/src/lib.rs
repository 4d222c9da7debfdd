//! Configuration for the sparkify warehouse pipeline.
//!
//! Looks for `dwh.toml` in the current directory or any parent directory,
//! unless an explicit path is given.
//!
//! ```toml
//! [cluster]
//! host = "example.us-west-2.redshift.amazonaws.com"
//! db_name = "dwh"
//! db_user = "dwhuser"
//! db_password = "secret"
//! db_port = 5439
//!
//! [iam_role]
//! arn = "arn:aws:iam::123456789012:role/dwhRole"
//!
//! [s3]
//! log_data = "s3://udacity-dend/log_data"
//! log_jsonpath = "s3://udacity-dend/log_json_path.json"
//! song_data = "s3://udacity-dend/song_data"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the file searched for when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "dwh.toml";

/// Region the bulk loads read from when `[s3] region` is absent.
pub const DEFAULT_REGION: &str = "us-west-2";

/// Top-level configuration loaded from `dwh.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Warehouse connection parameters.
    pub cluster: ClusterConfig,

    /// Role the warehouse assumes to read object storage.
    pub iam_role: IamRole,

    /// Object-storage locations of the raw logs.
    pub s3: StorageConfig,

    /// How statements are rendered.
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Warehouse connection parameters.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    pub host: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_port: u16,
}

impl ClusterConfig {
    /// Connection target for logs, with the password masked.
    pub fn display_target(&self) -> String {
        format!(
            "postgres://{}:***@{}:{}/{}",
            self.db_user, self.host, self.db_port, self.db_name
        )
    }
}

// Hand-written so the password never ends up in logs.
impl std::fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &"***")
            .field("db_port", &self.db_port)
            .finish()
    }
}

/// IAM role handed to the warehouse in COPY credentials.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IamRole {
    pub arn: String,
}

/// Object-storage locations for the two staging loads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Prefix holding the app-activity event logs.
    pub log_data: String,

    /// JSONPaths manifest mapping event log fields to staging columns.
    pub log_jsonpath: String,

    /// Prefix holding the song metadata files.
    pub song_data: String,

    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Rendering choices that don't depend on where the data lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSettings {
    #[serde(default)]
    pub dialect: Dialect,

    #[serde(default)]
    pub user_level: UserLevelPolicy,
}

/// SQL flavour the statements are rendered for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Amazon Redshift, the production warehouse.
    #[default]
    Redshift,
    /// Plain PostgreSQL. Schema and transforms only; there is no object-storage COPY.
    Postgres,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Redshift => write!(f, "redshift"),
            Dialect::Postgres => write!(f, "postgres"),
        }
    }
}

/// Which subscription level a user row keeps when their events disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserLevelPolicy {
    /// Level from the user's most recent NextSong event.
    #[default]
    Latest,
    /// Plain `SELECT DISTINCT` over all user columns; a user whose level
    /// changed yields one row per level.
    ///
    /// Redshift does not enforce the `users` primary key, so those rows all
    /// land. Postgres does, and the users insert fails for any such user;
    /// use `Latest` for local runs.
    Distinct,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the warehouse would otherwise reject late, mid-run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("cluster.host", &self.cluster.host),
            ("cluster.db_name", &self.cluster.db_name),
            ("cluster.db_user", &self.cluster.db_user),
            ("s3.region", &self.s3.region),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must not be empty".to_string(),
                });
            }
        }

        if self.cluster.db_port == 0 {
            return Err(ConfigError::Invalid {
                key: "cluster.db_port",
                reason: "must be a non-zero port".to_string(),
            });
        }

        let locations = [
            ("s3.log_data", &self.s3.log_data),
            ("s3.log_jsonpath", &self.s3.log_jsonpath),
            ("s3.song_data", &self.s3.song_data),
        ];
        for (key, value) in locations {
            if !value.starts_with("s3://") {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("expected an s3:// location, got '{}'", value),
                });
            }
        }

        if !self.iam_role.arn.starts_with("arn:") {
            return Err(ConfigError::Invalid {
                key: "iam_role.arn",
                reason: format!("expected an ARN, got '{}'", self.iam_role.arn),
            });
        }

        Ok(())
    }
}

/// Load configuration from an explicit path, or search for `dwh.toml`
/// from the current directory upwards.
pub fn load(explicit: Option<&Path>) -> Result<(Config, PathBuf), ConfigError> {
    match explicit {
        Some(path) => Ok((load_file(path)?, path.to_path_buf())),
        None => {
            let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(e.to_string()))?;
            load_from(&cwd)
        }
    }
}

/// Load configuration starting from a specific directory.
pub fn load_from(start: &Path) -> Result<(Config, PathBuf), ConfigError> {
    let config_path = find_config_file(start)?;
    let config = load_file(&config_path)?;
    Ok((config, config_path))
}

fn load_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    Config::from_toml(&content)
}

/// Find `dwh.toml` by searching up the directory tree.
fn find_config_file(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No `dwh.toml` in the current directory or any parent
    NotFound,
    /// I/O error reading the file
    Io(String),
    /// The file is not valid TOML or doesn't match the expected shape
    Parse(String),
    /// A value is present but unusable
    Invalid { key: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound => write!(
                f,
                "No {} found in current directory or any parent",
                CONFIG_FILE_NAME
            ),
            ConfigError::Io(e) => write!(f, "Failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid { key, reason } => write!(f, "Invalid `{}`: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}
