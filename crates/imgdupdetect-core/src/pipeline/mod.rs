//! Producer / worker pool / single writer scan pipeline.
//!
//! ```text
//!   caller thread            fingerprint-0..N          store-writer
//!  +--------------+  intake  +---------------+ results +------------+
//!  | read headers | -------> | digest images | ------> | store.add  |
//!  +--------------+ bounded  +---------------+ bounded +------------+
//! ```
//!
//! Both queues are bounded by `queue_capacity`; a capacity of zero makes
//! every handoff a rendezvous. `run` returns only after the writer and every
//! worker have been joined, so all successful adds are visible to readers.

use crossbeam::channel::{bounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fingerprint_error, log_store_error};
use crate::persistence::ContentStore;
use crate::stats::ScanStats;
use crate::types::{Fingerprint, ImageDescriptor, ScanMode};

/// Cooperative stop signal shared by every pipeline role
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every role to stop at its next handoff
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type Digested = (ImageDescriptor, Fingerprint);

/// One scan of candidate paths into a store collection
pub struct ScanPipeline<'a> {
    store: &'a ContentStore,
    stats: &'a ScanStats,
    collection: String,
    mode: ScanMode,
    workers: usize,
    queue_capacity: usize,
    cancel: CancellationToken,
    progress: ProgressBar,
}

impl<'a> ScanPipeline<'a> {
    pub fn new(store: &'a ContentStore, stats: &'a ScanStats, config: &Config) -> Self {
        let progress = if config.show_progress {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner} [{elapsed}] {pos} images stored")
            {
                bar.set_style(style);
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            store,
            stats,
            collection: config.collection_name().to_string(),
            mode: config.mode,
            workers: config.worker_count().max(1),
            queue_capacity: config.queue_capacity,
            cancel: CancellationToken::new(),
            progress,
        }
    }

    /// Share an existing token instead of the pipeline's own
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Push every path through the pipeline and wait for all roles to finish.
    ///
    /// Per-file failures are logged and counted in the stats. An error is
    /// returned only when a pipeline thread cannot be started or panics.
    pub fn run<I>(&self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        info!(
            "Scanning into collection {} with {} workers (queue capacity {})",
            self.collection, self.workers, self.queue_capacity
        );

        let outcome = thread::scope(|scope| -> Result<()> {
            let (intake_tx, intake_rx) = bounded::<ImageDescriptor>(self.queue_capacity);
            let (result_tx, result_rx) = bounded::<Digested>(self.queue_capacity);

            let writer = thread::Builder::new()
                .name("store-writer".to_string())
                .spawn_scoped(scope, move || self.write_results(result_rx))
                .map_err(|e| Error::Pipeline(format!("failed to start store writer: {}", e)))?;

            let mut workers = Vec::with_capacity(self.workers);
            for id in 0..self.workers {
                let intake = intake_rx.clone();
                let results = result_tx.clone();
                let handle = thread::Builder::new()
                    .name(format!("fingerprint-{}", id))
                    .spawn_scoped(scope, move || self.fingerprint_images(intake, results))
                    .map_err(|e| Error::Pipeline(format!("failed to start worker {}: {}", id, e)))?;
                workers.push(handle);
            }

            // Only the spawned roles may hold these ends
            drop(intake_rx);
            drop(result_tx);

            self.produce(paths, intake_tx);

            let mut panicked = 0;
            for handle in workers {
                if handle.join().is_err() {
                    panicked += 1;
                }
            }
            if writer.join().is_err() {
                return Err(Error::Pipeline("store writer panicked".to_string()));
            }
            if panicked > 0 {
                return Err(Error::Pipeline(format!("{} fingerprint workers panicked", panicked)));
            }
            Ok(())
        });

        self.progress.finish_and_clear();
        if self.cancel.is_cancelled() {
            info!("Scan cancelled after storing {} records", self.progress.position());
        }
        outcome
    }

    /// Read headers on the calling thread and hand descriptors to the workers
    fn produce<I>(&self, paths: I, intake: Sender<ImageDescriptor>)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        for path in paths {
            if self.cancel.is_cancelled() {
                debug!("producer stopping on cancellation");
                break;
            }

            match ImageDescriptor::open(&path) {
                Ok(descriptor) => {
                    self.stats.image_found();
                    if intake.send(descriptor).is_err() {
                        // Every worker is gone
                        break;
                    }
                }
                Err(e) => {
                    log_file_error(&path, "read header", &e);
                    self.stats.record_failure();
                }
            }
        }
    }

    fn fingerprint_images(&self, intake: Receiver<ImageDescriptor>, results: Sender<Digested>) {
        for descriptor in intake {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.mode.digest(&descriptor) {
                Ok(fingerprint) => {
                    self.stats.fingerprint_computed();
                    if results.send((descriptor, fingerprint)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log_fingerprint_error(&descriptor.path, &e);
                    self.stats.record_failure();
                }
            }
        }
    }

    fn write_results(&self, results: Receiver<Digested>) {
        for (descriptor, fingerprint) in results {
            if self.cancel.is_cancelled() {
                debug!("store writer stopping on cancellation");
                break;
            }

            let filename = descriptor.filename();
            match self
                .store
                .add(&self.collection, &fingerprint, &filename, &descriptor.metadata())
            {
                Ok(()) => {
                    self.stats.record_stored();
                    self.progress.inc(1);
                }
                Err(e) => {
                    log_store_error(&self.collection, &filename, &e);
                    self.stats.record_failure();
                }
            }
        }
    }
}
