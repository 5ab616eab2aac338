//! SQLite configuration.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{SqliteError, SqliteResult};

/// Environment variable read by [`SqliteConfig::from_env`].
pub const DATABASE_URL_ENV: &str = "GARNET_DATABASE_URL";

/// SQLite database configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Where the database lives.
    pub path: DatabasePath,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
    /// Page cache size (pages, or KiB when negative).
    pub cache_size: Option<i32>,
    /// Synchronous mode.
    pub synchronous: SynchronousMode,
    /// Journal mode. Ignored for in-memory databases.
    pub journal_mode: JournalMode,
}

/// Database location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// Private in-memory database, gone when the engine is dropped.
    #[default]
    Memory,
    /// Database file.
    File(PathBuf),
}

impl DatabasePath {
    /// Check if this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Human-readable location, for logs.
    pub fn display(&self) -> String {
        match self {
            Self::Memory => ":memory:".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// SQLite synchronous mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynchronousMode {
    /// No syncing; fastest, unsafe on power loss.
    Off,
    /// Sync at critical moments.
    #[default]
    Normal,
    /// Sync on every commit.
    Full,
    /// Like `Full`, also syncing the directory.
    Extra,
}

impl SynchronousMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
            Self::Extra => "EXTRA",
        }
    }
}

impl FromStr for SynchronousMode {
    type Err = SqliteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Ok(Self::Off),
            "normal" | "1" => Ok(Self::Normal),
            "full" | "2" => Ok(Self::Full),
            "extra" | "3" => Ok(Self::Extra),
            other => Err(SqliteError::config(format!("unknown synchronous mode '{}'", other))),
        }
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JournalMode {
    /// Delete the rollback journal after each transaction.
    Delete,
    /// Truncate the journal instead of deleting it.
    Truncate,
    /// Keep the journal file and zero its header.
    Persist,
    /// Keep the journal in memory.
    Memory,
    /// Write-ahead log.
    #[default]
    Wal,
    /// No journal.
    Off,
}

impl JournalMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }
}

impl FromStr for JournalMode {
    type Err = SqliteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "truncate" => Ok(Self::Truncate),
            "persist" => Ok(Self::Persist),
            "memory" => Ok(Self::Memory),
            "wal" => Ok(Self::Wal),
            "off" => Ok(Self::Off),
            other => Err(SqliteError::config(format!("unknown journal mode '{}'", other))),
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            foreign_keys: true,
            busy_timeout_ms: Some(5000),
            cache_size: Some(-2000),
            synchronous: SynchronousMode::Normal,
            journal_mode: JournalMode::Wal,
        }
    }
}

impl SqliteConfig {
    /// Configuration for a private in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Configuration for a database file.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: DatabasePath::File(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Parse a connection URL.
    ///
    /// Accepted forms:
    /// - `sqlite::memory:` or `:memory:`
    /// - `sqlite://path/to/db.sqlite` (relative) or `sqlite:///abs/db.sqlite`
    /// - `sqlite:path/to/db.sqlite`, `file:path/to/db.sqlite`
    ///
    /// Options follow `?` as `key=value` pairs joined by `&`: `mode=memory`,
    /// `foreign_keys`, `busy_timeout`, `cache_size`, `synchronous`,
    /// `journal_mode`.
    ///
    /// ```rust
    /// use garnet_sqlite::{SqliteConfig, SynchronousMode};
    ///
    /// let config = SqliteConfig::from_url("sqlite://app.db?synchronous=full").unwrap();
    /// assert_eq!(config.synchronous, SynchronousMode::Full);
    /// ```
    pub fn from_url(url: impl AsRef<str>) -> SqliteResult<Self> {
        let url = url.as_ref().trim();
        let (location, options) = match url.split_once('?') {
            Some((location, options)) => (location, Some(options)),
            None => (url, None),
        };

        let location = location
            .strip_prefix("sqlite://")
            .or_else(|| location.strip_prefix("sqlite:"))
            .or_else(|| location.strip_prefix("file:"))
            .unwrap_or(location);

        let mut config = match location {
            ":memory:" => Self::memory(),
            "" => return Err(SqliteError::config("database path is required")),
            path => Self::file(path),
        };

        for pair in options.into_iter().flat_map(|o| o.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| SqliteError::config(format!("option '{}' has no value", pair)))?;
            config.apply_option(key, value)?;
        }

        Ok(config)
    }

    /// Read the connection URL from `GARNET_DATABASE_URL`.
    pub fn from_env() -> SqliteResult<Self> {
        let url = env::var(DATABASE_URL_ENV)
            .map_err(|_| SqliteError::config(format!("{} is not set", DATABASE_URL_ENV)))?;
        Self::from_url(url)
    }

    fn apply_option(&mut self, key: &str, value: &str) -> SqliteResult<()> {
        let invalid = || SqliteError::config(format!("invalid value '{}' for '{}'", value, key));
        match key {
            "mode" if value == "memory" => self.path = DatabasePath::Memory,
            "foreign_keys" => {
                self.foreign_keys = match value {
                    "true" | "1" | "on" => true,
                    "false" | "0" | "off" => false,
                    _ => return Err(invalid()),
                }
            }
            "busy_timeout" => self.busy_timeout_ms = Some(value.parse().map_err(|_| invalid())?),
            "cache_size" => self.cache_size = Some(value.parse().map_err(|_| invalid())?),
            "synchronous" => self.synchronous = value.parse()?,
            "journal_mode" => self.journal_mode = value.parse()?,
            _ => {}
        }
        Ok(())
    }

    /// Pragmas run on every new connection.
    pub fn init_sql(&self) -> String {
        let mut sql = format!(
            "PRAGMA foreign_keys = {};\n",
            if self.foreign_keys { "ON" } else { "OFF" }
        );

        if !self.path.is_memory() {
            sql.push_str(&format!(
                "PRAGMA journal_mode = {};\n",
                self.journal_mode.as_pragma()
            ));
        }
        sql.push_str(&format!(
            "PRAGMA synchronous = {};\n",
            self.synchronous.as_pragma()
        ));
        if let Some(timeout) = self.busy_timeout_ms {
            sql.push_str(&format!("PRAGMA busy_timeout = {};\n", timeout));
        }
        if let Some(cache) = self.cache_size {
            sql.push_str(&format!("PRAGMA cache_size = {};\n", cache));
        }
        sql
    }

    /// Enable or disable foreign keys.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Set the busy timeout in milliseconds.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }

    /// Set the cache size.
    pub fn cache_size(mut self, size: i32) -> Self {
        self.cache_size = Some(size);
        self
    }

    /// Set the synchronous mode.
    pub fn synchronous(mut self, mode: SynchronousMode) -> Self {
        self.synchronous = mode;
        self
    }

    /// Set the journal mode.
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }
}
