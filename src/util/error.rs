//! Error types for the Alembic core.

use thiserror::Error;

/// Coarse classification of an [`Error`].
///
/// Callers that need to tell "doesn't exist" apart from "bad index
/// arithmetic" branch on this instead of matching every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed data type, zero extent, unknown time sampling id, bad name.
    InvalidArgument,
    /// Sibling name collision.
    DuplicateName,
    /// Missing child/property by name, or acyclic time lookup out of range.
    NotFound,
    /// Numeric index past the end of a sequence.
    IndexOutOfRange,
    /// Sample pod/extent disagrees with the declared property type.
    TypeMismatch,
    /// Operation on a closed archive, a busy or existing target, or a
    /// sample read from a property with no samples.
    InvalidState,
    /// Backend validation failure: bad magic, version, truncation, corruption.
    InvalidFormat,
    /// Underlying I/O failure.
    Io,
}

/// Main error type for Alembic core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed argument supplied by the caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A sibling with the same name already exists.
    #[error("Duplicate name '{name}' under '{parent}'")]
    DuplicateName { parent: String, name: String },

    /// Object not found by name or path.
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Property not found by name.
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// Acyclic time sampling has no time for the requested index.
    #[error("No sample time for index {index} (acyclic sampling holds {count} times)")]
    SampleTimeNotFound { index: usize, count: usize },

    /// Sample index out of bounds.
    #[error("Sample index {index} out of bounds (count: {count})")]
    SampleOutOfBounds { index: usize, count: usize },

    /// Sample requested from a property that holds none.
    #[error("Property '{0}' has no samples")]
    NoSamples(String),

    /// Child or property index out of bounds.
    #[error("Child index {index} out of bounds (count: {count})")]
    ChildOutOfBounds { index: usize, count: usize },

    /// Type mismatch between a sample and its property.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Archive has been closed.
    #[error("Archive '{0}' is closed")]
    Closed(String),

    /// Write target already exists and exclusive creation was requested.
    #[error("Target already exists: {0}")]
    TargetExists(String),

    /// Another writer holds the target.
    #[error("Target is already open for writing: {0}")]
    WriterBusy(String),

    /// Backend store failed validation or is corrupt.
    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    /// Store is truncated.
    #[error("Unexpected end of store at position {0}")]
    UnexpectedEof(u64),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error while decoding string samples.
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid format error.
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create a type mismatch error from two displayable descriptions.
    pub fn type_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::DuplicateName { .. } => ErrorKind::DuplicateName,
            Self::ObjectNotFound(_) | Self::PropertyNotFound(_) | Self::SampleTimeNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::SampleOutOfBounds { .. } | Self::ChildOutOfBounds { .. } => {
                ErrorKind::IndexOutOfRange
            }
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::Closed(_) | Self::NoSamples(_) | Self::TargetExists(_) | Self::WriterBusy(_) => {
                ErrorKind::InvalidState
            }
            Self::InvalidFormat(_) | Self::UnexpectedEof(_) | Self::Utf8(_) => ErrorKind::InvalidFormat,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type alias for Alembic core operations.
pub type Result<T> = std::result::Result<T, Error>;
