use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::Result;
use crate::types::Fingerprint;

/// BLAKE3 digest of a file's raw bytes, keyed in the checksum collection
pub fn checksum_file<P: AsRef<Path>>(path: P) -> Result<Fingerprint> {
    let file = File::open(path.as_ref())?;
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(BufReader::new(file))?;
    Ok(Fingerprint::new(*hasher.finalize().as_bytes()))
}
