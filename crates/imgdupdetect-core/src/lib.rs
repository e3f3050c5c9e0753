//! Core functionality for finding visually duplicate images.
//!
//! This library provides the foundational components for duplicate detection:
//! - File discovery by glob matchers
//! - Pixel fingerprinting and whole-file checksums
//! - A transactional content store indexed by fingerprint
//! - A concurrent scan pipeline and duplicate grouping

// -- External Dependencies --
use log::info;
use serde::Serialize;

// -- Standard Library --
use std::io::Write;
use std::path::Path;

// -- Public Re-exports --
pub use config::*;
pub use deduplication::{DuplicateGroup, DuplicateReport, DuplicateResolver};
pub use error::{Error, Result};
pub use persistence::{ContentStore, PersistenceError};
pub use pipeline::{CancellationToken, ScanPipeline};
pub use stats::{ScanStats, ScanSummary};
pub use types::*;

// -- Public Modules --
pub mod config;
pub mod deduplication;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod pipeline;
pub mod processing;
pub mod stats;
pub mod types;

/// Outcome of one scan: the statistics and every duplicate group found
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub summary: ScanSummary,
    pub groups: Vec<DuplicateGroup>,
}

/// Main entry point for duplicate detection
pub struct DupDetector {
    config: Config,
    store: ContentStore,
    cancel: CancellationToken,
}

impl DupDetector {
    /// Validate the configuration and open the store it names
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let store = ContentStore::open(&config.database_path)?;
        Self::with_store(config, store)
    }

    /// Use an already opened store, e.g. an in-memory one
    pub fn with_store(config: Config, store: ContentStore) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Token that stops a running scan when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Discover, fingerprint and store every image under `directories`, then
    /// group the collection's files by fingerprint.
    pub fn scan<P: AsRef<Path>>(&self, directories: &[P]) -> Result<ScanReport> {
        let stats = ScanStats::new();

        info!("Looking for duplicates...");
        for dir in directories {
            info!(" - {}", dir.as_ref().display());
        }

        let paths = discovery::discover(directories, &self.config)?;
        ScanPipeline::new(&self.store, &stats, &self.config)
            .with_cancellation(self.cancel.clone())
            .run(paths)?;

        let report = self.duplicates()?;
        for group in &report.groups {
            info!("found duplicates:");
            for file in &group.files {
                info!("  - {}", file);
            }
        }
        stats.add_duplicates(report.duplicate_count());
        stats.complete();

        let summary = stats.snapshot();
        info!("{}", summary);
        Ok(ScanReport {
            summary,
            groups: report.groups,
        })
    }

    /// Duplicate groups currently recorded in the configured collection
    pub fn duplicates(&self) -> Result<DuplicateReport> {
        DuplicateResolver::new(&self.store).resolve(self.config.collection_name())
    }

    /// Drop the configured collection, returning how many files it held
    pub fn clear(&self) -> Result<usize> {
        Ok(self.store.clear(self.config.collection_name())?)
    }

    /// Write every stored record to `sink`, returning the line count
    pub fn dump<W: Write>(&self, sink: &mut W) -> Result<usize> {
        Ok(self.store.dump(sink)?)
    }
}
