/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Persistence-specific errors
#[derive(Debug)]
pub enum PersistenceError {
    /// SQLite errors
    Database(rusqlite::Error),

    /// Missing collection, fingerprint or filename
    NotFound(String),

    /// Empty collection or filename key
    InvalidKey(String),

    /// A stored record could not be decoded
    Corrupt(String),

    /// Failure writing a dump
    Io(std::io::Error),

    /// A thread panicked while holding the store lock
    Poisoned,
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err)
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err)
    }
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database(err) => write!(f, "Database error: {}", err),
            Self::NotFound(what) => write!(f, "Entry not found: {}", what),
            Self::InvalidKey(msg) => write!(f, "Invalid key: {}", msg),
            Self::Corrupt(msg) => write!(f, "Corrupt record: {}", msg),
            Self::Io(err) => write!(f, "Dump failed: {}", err),
            Self::Poisoned => write!(f, "Store lock poisoned"),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl PersistenceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
