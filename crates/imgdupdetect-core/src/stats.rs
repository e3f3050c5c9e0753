use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Counters and timers for one scan, shared by reference across pipeline threads
#[derive(Debug)]
pub struct ScanStats {
    started: Instant,
    finished: Mutex<Option<Instant>>,
    images_found: AtomicUsize,
    fingerprints: AtomicUsize,
    stored: AtomicUsize,
    failed: AtomicUsize,
    duplicates: AtomicUsize,
}

/// Point-in-time copy of the scan statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub images_found: usize,
    pub fingerprint_count: usize,
    pub stored: usize,
    pub failed: usize,
    pub duplicates_found: usize,
    pub elapsed: Duration,
    pub avg_per_fingerprint: Duration,
    pub complete: bool,
}

impl ScanStats {
    /// Start the clock
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            finished: Mutex::new(None),
            images_found: AtomicUsize::new(0),
            fingerprints: AtomicUsize::new(0),
            stored: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            duplicates: AtomicUsize::new(0),
        }
    }

    pub fn image_found(&self) {
        self.images_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fingerprint_computed(&self) {
        self.fingerprints.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::Relaxed);
    }

    /// A file that was skipped because of an error
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_duplicates(&self, count: usize) {
        self.duplicates.fetch_add(count, Ordering::Relaxed);
    }

    /// Stop the clock; later calls keep the first end time
    pub fn complete(&self) {
        let mut finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
        finished.get_or_insert_with(Instant::now);
    }

    /// End minus start once complete, otherwise time so far
    pub fn elapsed(&self) -> Duration {
        let finished = *self.finished.lock().unwrap_or_else(|e| e.into_inner());
        finished.unwrap_or_else(Instant::now) - self.started
    }

    pub fn snapshot(&self) -> ScanSummary {
        let fingerprint_count = self.fingerprints.load(Ordering::Relaxed);
        let elapsed = self.elapsed();
        let complete = self
            .finished
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some();

        ScanSummary {
            images_found: self.images_found.load(Ordering::Relaxed),
            fingerprint_count,
            stored: self.stored.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            duplicates_found: self.duplicates.load(Ordering::Relaxed),
            elapsed,
            avg_per_fingerprint: average(elapsed, fingerprint_count),
            complete,
        }
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Elapsed time per fingerprint, zero when nothing was fingerprinted
fn average(elapsed: Duration, count: usize) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((elapsed.as_nanos() / count as u128) as u64)
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanning took {:?} (avg {:?}/image); found {} images; fingerprinted {} images; {} failed; {} duplicates found",
            self.elapsed,
            self.avg_per_fingerprint,
            self.images_found,
            self.fingerprint_count,
            self.failed,
            self.duplicates_found
        )
    }
}
