//! Global poolday configuration at ~/.config/poolday/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MATERIALIZE_DAYS, DEFAULT_REMOTE_TIMEOUT};
use crate::error::{PoolDayError, PoolDayResult};
use crate::remote::{Provider, Remote};
use crate::time_window::TimeWindow;

static DEFAULT_QUEUE_DIR: &str = "~/.local/share/poolday/queue";

fn default_queue_dir() -> PathBuf {
    PathBuf::from(DEFAULT_QUEUE_DIR)
}

fn default_remote_timeout() -> String {
    DEFAULT_REMOTE_TIMEOUT.to_string()
}

fn default_materialize_days() -> i64 {
    DEFAULT_MATERIALIZE_DAYS
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PooldayConfig {
    /// Offset of the service's civil timezone from UTC, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,

    #[serde(default = "default_queue_dir")]
    pub queue_dir: PathBuf,

    /// Name of the remote provider, e.g. "http" for `poolday-remote-http`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// Per-call deadline for remote requests, e.g. "10s", "1m 30s"
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout: String,

    /// How far ahead open-ended series are materialized
    #[serde(default = "default_materialize_days")]
    pub materialize_days: i64,
}

impl Default for PooldayConfig {
    fn default() -> Self {
        PooldayConfig {
            utc_offset_minutes: 0,
            queue_dir: default_queue_dir(),
            remote: None,
            remote_timeout: default_remote_timeout(),
            materialize_days: default_materialize_days(),
        }
    }
}

impl PooldayConfig {
    pub fn config_path() -> PoolDayResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| PoolDayError::Config("Could not determine config directory".into()))?
            .join("poolday");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, writing a commented default file
    /// first if there is none.
    pub fn load() -> PoolDayResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load `path` (optional) with `POOLDAY_*` environment overrides on top.
    pub fn load_from(path: &Path) -> PoolDayResult<Self> {
        let config: PooldayConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("POOLDAY").try_parsing(true))
            .build()
            .map_err(|e| PoolDayError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PoolDayError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> PoolDayResult<()> {
        self.time_window()?;
        self.remote_timeout()?;
        if self.materialize_days < 0 {
            return Err(PoolDayError::Config(
                "materialize_days must not be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn time_window(&self) -> PoolDayResult<TimeWindow> {
        TimeWindow::from_offset_minutes(self.utc_offset_minutes)
    }

    pub fn remote_timeout(&self) -> PoolDayResult<Duration> {
        let timeout = humantime::parse_duration(&self.remote_timeout).map_err(|e| {
            PoolDayError::Config(format!(
                "Invalid remote_timeout '{}': {}",
                self.remote_timeout, e
            ))
        })?;

        if timeout.is_zero() {
            return Err(PoolDayError::Config("remote_timeout must be positive".into()));
        }
        Ok(timeout)
    }

    /// Days past a series' start through which open-ended series are
    /// materialized; pass to `Schedule::create_series`.
    pub fn materialize_horizon(&self) -> i64 {
        self.materialize_days
    }

    /// Queue directory with `~` expanded.
    pub fn queue_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.queue_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    /// The configured remote store, if any.
    pub fn remote(&self) -> PoolDayResult<Option<Remote>> {
        let Some(name) = &self.remote else {
            return Ok(None);
        };
        let provider = Provider::new(name, self.remote_timeout()?);
        Ok(Some(Remote::new(provider)))
    }

    /// Save to ~/.config/poolday/config.toml
    pub fn save(&self) -> PoolDayResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> PoolDayResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PoolDayError::Config(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| PoolDayError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> PoolDayResult<()> {
        let contents = format!(
            "\
# poolday configuration

# Offset of your service area's timezone from UTC, in minutes:
# utc_offset_minutes = -300

# Where unsent service records are kept while offline:
# queue_dir = \"{}\"

# Remote store provider (runs poolday-remote-<name> from PATH):
# remote = \"http\"

# How long to wait for each remote request:
# remote_timeout = \"{}\"

# How many days ahead open-ended series are scheduled:
# materialize_days = {}
",
            DEFAULT_QUEUE_DIR, DEFAULT_REMOTE_TIMEOUT, DEFAULT_MATERIALIZE_DAYS
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PoolDayError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| PoolDayError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
