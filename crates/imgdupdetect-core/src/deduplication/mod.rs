use log::{debug, info};
use serde::Serialize;

use crate::error::Result;
use crate::persistence::ContentStore;
use crate::types::Fingerprint;

/// Files sharing one fingerprint within one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub fingerprint: Fingerprint,
    /// Member filenames in store order
    pub files: Vec<String>,
}

impl DuplicateGroup {
    /// The conventional "original": the first member in store order.
    ///
    /// Store order is filename ascending, not discovery order.
    pub fn original(&self) -> Option<&str> {
        self.files.first().map(String::as_str)
    }

    /// Every member except the original
    pub fn duplicates(&self) -> &[String] {
        self.files.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Duplicate groups of one collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    /// Distinct fingerprints seen, including singletons
    pub fingerprint_count: usize,
}

impl DuplicateReport {
    /// Files beyond the original of each group
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.len().saturating_sub(1)).sum()
    }
}

/// Groups the files of a collection by fingerprint
pub struct DuplicateResolver<'a> {
    store: &'a ContentStore,
}

impl<'a> DuplicateResolver<'a> {
    pub fn new(store: &'a ContentStore) -> Self {
        Self { store }
    }

    /// Every fingerprint group of `collection` with more than one member,
    /// in fingerprint order
    pub fn resolve(&self, collection: &str) -> Result<DuplicateReport> {
        let fingerprints = self.store.list_fingerprints(collection)?;
        let mut groups = Vec::new();

        for fingerprint in &fingerprints {
            let files = self.store.list_files(collection, fingerprint)?;
            if files.len() > 1 {
                debug!("{} files share {}", files.len(), fingerprint);
                groups.push(DuplicateGroup {
                    fingerprint: *fingerprint,
                    files: files.into_iter().collect(),
                });
            }
        }

        let report = DuplicateReport {
            groups,
            fingerprint_count: fingerprints.len(),
        };
        info!(
            "Collection {}: {} fingerprints, {} duplicate groups, {} duplicates",
            collection,
            report.fingerprint_count,
            report.groups.len(),
            report.duplicate_count()
        );
        Ok(report)
    }
}
