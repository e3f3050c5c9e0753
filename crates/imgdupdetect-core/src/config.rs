use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{ImageFormat, ScanMode};

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for a duplicate detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the content store database file
    pub database_path: PathBuf,

    /// Which digest to compute
    pub mode: ScanMode,

    /// Collection to record into (defaults to the mode's collection)
    pub collection: Option<String>,

    /// Number of fingerprint worker threads (0 = auto)
    pub threads: usize,

    /// Capacity of the intake and result queues (0 = rendezvous handoff)
    pub queue_capacity: usize,

    /// Maximum directory depth for scanning
    pub max_depth: Option<usize>,

    /// Whether to follow symbolic links while walking
    pub follow_links: bool,

    /// Image formats to look for
    pub formats: Vec<ImageFormat>,

    /// Whether to draw a progress spinner while scanning
    pub show_progress: bool,

    /// Log level
    pub log_level: LogLevel,

    /// Directory for rolling log files (console logging when unset)
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("imgdupdetect.db"),
            mode: ScanMode::Fingerprint,
            collection: None,
            threads: 0, // Auto
            queue_capacity: 64,
            max_depth: None,
            follow_links: false,
            formats: ImageFormat::ALL.to_vec(),
            show_progress: false,
            log_level: LogLevel::Info,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::Configuration(format!(
                "failed to parse {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("failed to serialise config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.formats.is_empty() {
            return Err(Error::Configuration(
                "at least one image format must be enabled".to_string(),
            ));
        }

        if let Some(collection) = &self.collection {
            if collection.trim().is_empty() {
                return Err(Error::Configuration(
                    "collection name must not be empty".to_string(),
                ));
            }
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Configuration(
                "database path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Number of fingerprint workers after resolving auto
    pub fn worker_count(&self) -> usize {
        match self.threads {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    /// Collection this configuration records into
    pub fn collection_name(&self) -> &str {
        self.collection
            .as_deref()
            .unwrap_or_else(|| self.mode.collection())
    }
}
