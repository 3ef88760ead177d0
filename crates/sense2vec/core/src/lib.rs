//! Core types and errors shared by the sense2vec crates.

/// A dense vector - one embedding row.
pub type Vector = Vec<f32>;

/// Dense handle for an interned key string.
///
/// Ids are assigned in insertion order by the string store and are only
/// meaningful together with the table that produced them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct KeyId(pub u64);

impl KeyId {
    /// Position of this id in an id-indexed table.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for KeyId {
    fn from(index: usize) -> Self {
        Self(index as u64)
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A nearest-neighbor hit from the vector table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Id of the stored vector.
    pub id: KeyId,
    /// Cosine similarity against the query centroid.
    pub score: f32,
}

/// Errors produced by the sense2vec crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A vector's length differs from the table dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The table dimension.
        expected: usize,
        /// The length of the offending vector.
        actual: usize,
    },

    /// Strict lookup of a key that is not stored.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Caller passed something the operation cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Persisted data could not be decoded.
    #[error("corrupt persisted state: {0}")]
    CorruptPersistedState(String),

    /// In-memory state could not be serialized for saving.
    #[error("failed to encode {0}")]
    Encode(String),

    /// A file or directory required for loading does not exist.
    #[error("missing input file: {}", .0.display())]
    MissingInputFile(std::path::PathBuf),

    /// Any other filesystem failure.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// The path being read or written.
        path: std::path::PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for [`Error::CorruptPersistedState`].
    pub fn corrupt(msg: impl std::fmt::Display) -> Self {
        Self::CorruptPersistedState(msg.to_string())
    }

    /// An [`Error::Encode`] naming what was being written.
    pub fn encode(what: &str, source: impl std::fmt::Display) -> Self {
        Self::Encode(format!("{what}: {source}"))
    }
}

/// Result alias used across the sense2vec crates.
pub type Result<T, E = Error> = std::result::Result<T, E>;
