use std::fmt;

use rusqlite::Row;

use super::error::{PersistenceError, PersistenceResult};
use crate::types::{to_hex, Fingerprint};

/// Schema: one table per record kind
pub(crate) const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS members (
        collection TEXT NOT NULL,
        fingerprint BLOB NOT NULL,
        filename TEXT NOT NULL,
        PRIMARY KEY (collection, fingerprint, filename)
    ) WITHOUT ROWID;

    CREATE TABLE IF NOT EXISTS fields (
        collection TEXT NOT NULL,
        fingerprint BLOB NOT NULL,
        filename TEXT NOT NULL,
        field TEXT NOT NULL,
        value BLOB NOT NULL,
        PRIMARY KEY (collection, fingerprint, filename, field)
    ) WITHOUT ROWID;

    CREATE INDEX IF NOT EXISTS members_by_file ON members (collection, filename);
    CREATE INDEX IF NOT EXISTS fields_by_file ON fields (collection, filename);";

/// Membership of a file in a fingerprint group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub collection: String,
    pub fingerprint: Fingerprint,
    pub filename: String,
}

/// One metadata field of a member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    pub member: MemberRecord,
    pub field: String,
    pub value: Vec<u8>,
}

/// Decode a fingerprint column
pub(crate) fn fingerprint_from_blob(blob: &[u8]) -> PersistenceResult<Fingerprint> {
    Fingerprint::try_from(blob).map_err(|_| {
        PersistenceError::Corrupt(format!(
            "fingerprint has {} bytes, expected {}",
            blob.len(),
            Fingerprint::LEN
        ))
    })
}

impl MemberRecord {
    /// Read `collection, fingerprint, filename` from the first three columns
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<(String, Vec<u8>, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    }

    pub(crate) fn decode(
        (collection, fingerprint, filename): (String, Vec<u8>, String),
    ) -> PersistenceResult<Self> {
        Ok(Self {
            collection,
            fingerprint: fingerprint_from_blob(&fingerprint)?,
            filename,
        })
    }
}

impl fmt::Display for MemberRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.collection, self.fingerprint, self.filename)
    }
}

impl fmt::Display for FieldRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.member, self.field, to_hex(&self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_line_format() {
        let member = MemberRecord {
            collection: "fingerprint".to_string(),
            fingerprint: Fingerprint::new([0x11; 32]),
            filename: "/photos/a.jpg".to_string(),
        };
        let field = FieldRecord {
            member: member.clone(),
            field: "size".to_string(),
            value: vec![0, 0, 0, 0, 0, 0, 0x01, 0xff],
        };

        assert_eq!(
            member.to_string(),
            format!("fingerprint\t{}\t/photos/a.jpg", "11".repeat(32))
        );
        assert!(field.to_string().ends_with("\tsize\t00000000000001ff"));
    }

    #[test]
    fn test_short_fingerprint_blob_is_corrupt() {
        assert!(matches!(
            fingerprint_from_blob(&[1, 2, 3]),
            Err(PersistenceError::Corrupt(_))
        ));
    }
}
