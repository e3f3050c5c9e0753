use log::{debug, info};
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::error::{PersistenceError, PersistenceResult};
use super::models::{fingerprint_from_blob, FieldRecord, MemberRecord, SCHEMA};
use crate::types::{FileMetadata, Fingerprint};

/// Transactional index of collection -> fingerprint -> filename -> metadata.
///
/// Every call holds the single connection for the length of its transaction,
/// so at most one mutation is in flight and readers never see a partial `add`.
/// A fingerprint exists exactly as long as it has at least one member file:
/// removing the last filename removes the fingerprint, and a collection
/// disappears with its last fingerprint.
pub struct ContentStore {
    conn: Mutex<Connection>,
    location: Option<PathBuf>,
}

impl ContentStore {
    /// Open (or create) a durable store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        // Set pragmas for performance
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 10000;",
        )?;

        let store = Self::init(conn, Some(path.to_path_buf()))?;
        info!("Content store opened at {}", path.display());
        Ok(store)
    }

    /// Open a store that lives only as long as this value
    pub fn open_in_memory() -> PersistenceResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, location: Option<PathBuf>) -> PersistenceResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    /// Database file backing this store, if any
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| PersistenceError::Poisoned)
    }

    /// Record `filename` under `fingerprint` and upsert each metadata field.
    ///
    /// A filename already recorded under another fingerprint of the same
    /// collection is moved, taking its old metadata with it out of the store.
    /// Either the whole change commits, or nothing does.
    pub fn add(
        &self,
        collection: &str,
        fingerprint: &Fingerprint,
        filename: &str,
        metadata: &FileMetadata,
    ) -> PersistenceResult<()> {
        check_key("collection", collection)?;
        check_key("filename", filename)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // A file keeps one fingerprint per collection; drop stale memberships
        let moved = tx.execute(
            "DELETE FROM members WHERE collection = ?1 AND filename = ?2 AND fingerprint <> ?3",
            params![collection, filename, fingerprint.as_bytes()],
        )?;
        if moved > 0 {
            tx.execute(
                "DELETE FROM fields WHERE collection = ?1 AND filename = ?2 AND fingerprint <> ?3",
                params![collection, filename, fingerprint.as_bytes()],
            )?;
            debug!("{} changed content; moving it to {}", filename, fingerprint);
        }

        tx.execute(
            "INSERT OR IGNORE INTO members (collection, fingerprint, filename) VALUES (?1, ?2, ?3)",
            params![collection, fingerprint.as_bytes(), filename],
        )?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO fields (collection, fingerprint, filename, field, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (field, value) in metadata.iter() {
                stmt.execute(params![collection, fingerprint.as_bytes(), filename, field, value])?;
            }
        }

        tx.commit()?;
        debug!("Stored {} under {} in {}", filename, fingerprint, collection);
        Ok(())
    }

    /// Every member of a fingerprint group with its metadata
    pub fn get(
        &self,
        collection: &str,
        fingerprint: &Fingerprint,
    ) -> PersistenceResult<BTreeMap<String, FileMetadata>> {
        let conn = self.lock()?;

        if !collection_exists(&conn, collection)? {
            return Err(PersistenceError::NotFound(format!("collection {}", collection)));
        }

        let mut members = BTreeMap::new();
        {
            let mut stmt = conn.prepare_cached(
                "SELECT filename FROM members
                 WHERE collection = ?1 AND fingerprint = ?2 ORDER BY filename",
            )?;
            let rows = stmt.query_map(params![collection, fingerprint.as_bytes()], |row| {
                row.get::<_, String>(0)
            })?;
            for filename in rows {
                members.insert(filename?, FileMetadata::new());
            }
        }

        if members.is_empty() {
            return Err(PersistenceError::NotFound(format!(
                "fingerprint {} in {}",
                fingerprint, collection
            )));
        }

        let mut stmt = conn.prepare_cached(
            "SELECT filename, field, value FROM fields WHERE collection = ?1 AND fingerprint = ?2",
        )?;
        let rows = stmt.query_map(params![collection, fingerprint.as_bytes()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;
        for row in rows {
            let (filename, field, value) = row?;
            if let Some(metadata) = members.get_mut(&filename) {
                metadata.insert(field, value);
            }
        }

        Ok(members)
    }

    /// Delete a file and its metadata from a fingerprint group
    pub fn remove(
        &self,
        collection: &str,
        fingerprint: &Fingerprint,
        filename: &str,
    ) -> PersistenceResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if !collection_exists(&tx, collection)? {
            return Err(PersistenceError::NotFound(format!("collection {}", collection)));
        }
        if !fingerprint_exists(&tx, collection, fingerprint)? {
            return Err(PersistenceError::NotFound(format!(
                "fingerprint {} in {}",
                fingerprint, collection
            )));
        }

        let removed = tx.execute(
            "DELETE FROM members WHERE collection = ?1 AND fingerprint = ?2 AND filename = ?3",
            params![collection, fingerprint.as_bytes(), filename],
        )?;
        if removed == 0 {
            return Err(PersistenceError::NotFound(format!(
                "file {} under {} in {}",
                filename, fingerprint, collection
            )));
        }

        tx.execute(
            "DELETE FROM fields WHERE collection = ?1 AND fingerprint = ?2 AND filename = ?3",
            params![collection, fingerprint.as_bytes(), filename],
        )?;

        tx.commit()?;
        debug!("Removed {} from {} in {}", filename, fingerprint, collection);
        Ok(())
    }

    /// Fingerprints with at least one member; empty for an unknown collection
    pub fn list_fingerprints(&self, collection: &str) -> PersistenceResult<BTreeSet<Fingerprint>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT fingerprint FROM members WHERE collection = ?1",
        )?;
        let rows = stmt.query_map(params![collection], |row| row.get::<_, Vec<u8>>(0))?;

        let mut fingerprints = BTreeSet::new();
        for blob in rows {
            fingerprints.insert(fingerprint_from_blob(&blob?)?);
        }
        Ok(fingerprints)
    }

    /// Member filenames of a fingerprint group; empty if the group is absent
    pub fn list_files(
        &self,
        collection: &str,
        fingerprint: &Fingerprint,
    ) -> PersistenceResult<BTreeSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT filename FROM members WHERE collection = ?1 AND fingerprint = ?2",
        )?;
        let rows = stmt.query_map(params![collection, fingerprint.as_bytes()], |row| {
            row.get::<_, String>(0)
        })?;

        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// Names of every non-empty collection
    pub fn collections(&self) -> PersistenceResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare_cached("SELECT DISTINCT collection FROM members ORDER BY collection")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// Drop a whole collection, returning how many files it held
    pub fn clear(&self, collection: &str) -> PersistenceResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM fields WHERE collection = ?1", params![collection])?;
        let removed = tx.execute("DELETE FROM members WHERE collection = ?1", params![collection])?;

        tx.commit()?;
        info!("Cleared {} files from collection {}", removed, collection);
        Ok(removed)
    }

    /// Write every record as a tab-separated line, returning the line count.
    ///
    /// Members print as `collection fingerprint filename`; each metadata field
    /// prints as the member followed by `field hex(value)`.
    pub fn dump<W: Write>(&self, sink: &mut W) -> PersistenceResult<usize> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT m.collection, m.fingerprint, m.filename, f.field, f.value
             FROM members m
             LEFT JOIN fields f
               ON f.collection = m.collection
              AND f.fingerprint = m.fingerprint
              AND f.filename = m.filename
             ORDER BY m.collection, m.fingerprint, m.filename, f.field",
        )?;
        let mut rows = stmt.query([])?;

        let mut lines = 0;
        let mut previous: Option<MemberRecord> = None;
        while let Some(row) = rows.next()? {
            let member = MemberRecord::decode(MemberRecord::from_row(row)?)?;
            let field: Option<String> = row.get(3)?;
            let value: Option<Vec<u8>> = row.get(4)?;

            if previous.as_ref() != Some(&member) {
                writeln!(sink, "{}", member)?;
                lines += 1;
                previous = Some(member.clone());
            }

            if let (Some(field), Some(value)) = (field, value) {
                writeln!(sink, "{}", FieldRecord { member, field, value })?;
                lines += 1;
            }
        }

        sink.flush()?;
        Ok(lines)
    }
}

fn check_key(kind: &str, key: &str) -> PersistenceResult<()> {
    if key.is_empty() {
        return Err(PersistenceError::InvalidKey(format!("{} must not be empty", kind)));
    }
    Ok(())
}

fn collection_exists(conn: &Connection, collection: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM members WHERE collection = ?1)",
        params![collection],
        |row| row.get(0),
    )
}

fn fingerprint_exists(
    conn: &Connection,
    collection: &str,
    fingerprint: &Fingerprint,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM members WHERE collection = ?1 AND fingerprint = ?2)",
        params![collection, fingerprint.as_bytes()],
        |row| row.get(0),
    )
}
