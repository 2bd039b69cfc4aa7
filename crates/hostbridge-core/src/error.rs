//! Error types for the host object model

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for host-side operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value did not have the expected host type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        found: String,
    },

    /// Wrong number of arguments for a member
    #[error("'{member}' expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        /// Member name
        member: String,
        /// Declared arity
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// No constructor accepts the supplied argument count
    #[error("No constructor of '{class}' accepts {arity} argument(s)")]
    NoConstructor {
        /// Class name
        class: String,
        /// Supplied argument count
        arity: usize,
    },

    /// Field or method not declared on the class
    #[error("Member not found: {class}.{member}")]
    MemberNotFound {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Field exists but has no setter
    #[error("Field '{class}.{field}' is read-only")]
    ReadOnlyField {
        /// Class name
        class: String,
        /// Field name
        field: String,
    },

    /// Array shape the injection layer cannot unwrap
    #[error("Unsupported array: {0}")]
    UnsupportedArray(String),

    /// Sequence index out of range
    #[error("Index {index} out of bounds (length {len})")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Sequence length
        len: usize,
    },

    /// Failure raised by host code
    #[error("Host error: {0}")]
    Host(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a type mismatch error
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a member-not-found error
    pub fn member_not_found(class: impl Into<String>, member: impl Into<String>) -> Self {
        Error::MemberNotFound {
            class: class.into(),
            member: member.into(),
        }
    }

    /// Create a host error
    pub fn host(message: impl Into<String>) -> Self {
        Error::Host(message.into())
    }
}
