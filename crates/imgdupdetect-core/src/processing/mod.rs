// Digest engines
pub mod checksum;
pub mod fingerprint;

pub use checksum::checksum_file;
pub use fingerprint::{fingerprint, fingerprint_file, PixelSource};

use crate::error::Result;
use crate::types::{Fingerprint, ImageDescriptor, ScanMode};

impl ScanMode {
    /// Compute this mode's digest for a described image
    pub fn digest(&self, descriptor: &ImageDescriptor) -> Result<Fingerprint> {
        match self {
            ScanMode::Fingerprint => fingerprint_file(descriptor),
            ScanMode::Checksum => checksum_file(&descriptor.path),
        }
    }
}

#[cfg(test)]
mod tests;
