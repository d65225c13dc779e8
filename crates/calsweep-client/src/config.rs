//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calsweep/config.toml` by default:
//!
//! ```toml
//! calendar_ids = ["team@example.com", "oncall@example.com"]
//! time_min = "2024-01-01T00:00:00Z"
//!
//! [google]
//! credentials_file = "~/.config/calsweep/service-account.json"
//! subject = "admin@example.com"
//!
//! [store]
//! database = "/var/lib/calsweep/events.db"
//! batch_size = 500
//! ```
//!
//! Command-line flags override the file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use calsweep_core::parse_time_bound;
use calsweep_providers::{DEFAULT_PAGE_SIZE, EventQuery};
use calsweep_store::DEFAULT_BATCH_SIZE;

use crate::cli::RunArgs;
use crate::error::{ClientError, ClientResult};

/// Lower time bound used when neither the config nor `--since` sets one.
pub const DEFAULT_TIME_MIN: &str = "2024-01-01T00:00:00Z";

/// Configuration for calsweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Calendars to fetch, in order.
    pub calendar_ids: Vec<String>,

    /// Inclusive lower time bound (RFC 3339 or `YYYY-MM-DD`).
    pub time_min: String,

    /// Optional exclusive upper time bound.
    pub time_max: Option<String>,

    /// Google Calendar settings.
    pub google: GoogleSettings,

    /// Database settings for `collect`.
    pub store: StoreSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            calendar_ids: Vec::new(),
            time_min: DEFAULT_TIME_MIN.to_string(),
            time_max: None,
            google: GoogleSettings::default(),
            store: StoreSettings::default(),
        }
    }
}

/// Google Calendar provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Service account key, authorized-user or OAuth client JSON file.
    pub credentials_file: Option<PathBuf>,

    /// Cached token file, used with OAuth client credentials.
    pub token_path: Option<PathBuf>,

    /// User to impersonate with a service account.
    pub subject: Option<String>,

    /// Calendar API base URL override.
    pub base_url: Option<String>,

    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,

    /// Events requested per page.
    pub page_size: u32,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            credentials_file: None,
            token_path: None,
            subject: None,
            base_url: None,
            timeout_secs: 30,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite database file; defaults to the data directory.
    pub database: Option<PathBuf>,

    /// Rows per transaction.
    pub batch_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl StoreSettings {
    /// The configured database path, or the default one.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(ClientConfig::default_database_path)
    }
}

impl ClientConfig {
    /// Loads `path` if given, otherwise the default file if it exists.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse config {}: {}", path.display(), e))
        })
    }

    /// The file [`load`](Self::load) reads: `explicit` when given, the
    /// default path otherwise.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit.map_or_else(Self::default_path, Path::to_path_buf)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calsweep")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calsweep")
    }

    /// Returns the default SQLite database path.
    pub fn default_database_path() -> PathBuf {
        Self::default_data_dir().join("events.db")
    }

    /// Calendars for a run: `--calendar` flags replace the configured list.
    pub fn calendar_ids(&self, args: &RunArgs) -> ClientResult<Vec<String>> {
        let ids: Vec<String> = if args.calendars.is_empty() {
            self.calendar_ids.clone()
        } else {
            args.calendars.clone()
        };

        let ids: Vec<String> = ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        if ids.is_empty() {
            return Err(ClientError::Config(
                "no calendars configured: set calendar_ids in config.toml or pass --calendar"
                    .to_string(),
            ));
        }
        Ok(ids)
    }

    /// Builds the event query from config, with `--since`/`--until` taking
    /// precedence.
    pub fn event_query(&self, args: &RunArgs) -> ClientResult<EventQuery> {
        let time_min = parse_time_bound(args.since.as_deref().unwrap_or(&self.time_min))?;
        let time_max = args
            .until
            .as_deref()
            .or(self.time_max.as_deref())
            .map(parse_time_bound)
            .transpose()?;

        check_window(time_min, time_max)?;

        let mut query = EventQuery::new(time_min).with_page_size(self.google.page_size);
        if let Some(time_max) = time_max {
            query = query.with_time_max(time_max);
        }
        Ok(query)
    }

    /// Converts the Google settings into provider configuration.
    #[cfg(feature = "google")]
    pub fn google_config(
        &self,
        args: &RunArgs,
    ) -> ClientResult<calsweep_providers::google::GoogleConfig> {
        use calsweep_providers::google::GoogleConfig;

        let credentials = args
            .credentials
            .clone()
            .or_else(|| self.google.credentials_file.clone())
            .ok_or_else(|| {
                ClientError::Config(format!(
                    "Google credentials not found. Add to {}:\n  \
                     [google]\n  \
                     credentials_file = \"/path/to/service-account.json\"\n\n  \
                     Or pass --credentials <path>",
                    Self::default_path().display()
                ))
            })?;

        let mut config = GoogleConfig::new(credentials)
            .with_timeout(std::time::Duration::from_secs(self.google.timeout_secs));

        if let Some(ref path) = self.google.token_path {
            config = config.with_token_path(path);
        }
        if let Some(ref subject) = self.google.subject {
            config = config.with_subject(subject);
        }
        if let Some(ref base_url) = self.google.base_url {
            config = config.with_base_url(base_url);
        }

        config.validate().map_err(ClientError::Config)?;
        Ok(config)
    }

    /// Checks everything that can be checked without network access.
    pub fn validate(&self) -> ClientResult<()> {
        if self.calendar_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(ClientError::Config("calendar_ids must not be empty".to_string()));
        }

        let time_min = parse_time_bound(&self.time_min)?;
        let time_max = self.time_max.as_deref().map(parse_time_bound).transpose()?;
        check_window(time_min, time_max)?;

        if self.store.batch_size == 0 {
            return Err(ClientError::Config(
                "store.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.google.page_size == 0 || self.google.page_size > DEFAULT_PAGE_SIZE {
            return Err(ClientError::Config(format!(
                "google.page_size must be between 1 and {}",
                DEFAULT_PAGE_SIZE
            )));
        }
        if self.google.timeout_secs == 0 {
            return Err(ClientError::Config(
                "google.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_window(time_min: DateTime<Utc>, time_max: Option<DateTime<Utc>>) -> ClientResult<()> {
    match time_max {
        Some(max) if max <= time_min => Err(ClientError::Config(format!(
            "time_max ({}) must be after time_min ({})",
            max.to_rfc3339(),
            time_min.to_rfc3339()
        ))),
        _ => Ok(()),
    }
}
