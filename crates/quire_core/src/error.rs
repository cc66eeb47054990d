//! Unified error type for quire_core.
//!
//! Every fallible engine operation returns [`Result`]. The variants follow the
//! failure classes the editor distinguishes when it surfaces a problem:
//! missing content renders as an empty state, authentication failures send the
//! user back to login, persist/delete refusals and conflicts are shown with the
//! underlying message, and local backup failures never block editing.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, QuireError>;

/// Errors produced by the synchronization engine and its collaborators.
#[derive(Debug, Error)]
pub enum QuireError {
    /// Entry, file or media is absent from the backend.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials were rejected or the stored session is no longer valid.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The backend refused a write because the path is already taken.
    #[error("Persist conflict: {0}")]
    PersistConflict(String),

    /// The collection does not allow creating entries.
    #[error("Not allowed to create new entries in collection '{0}'")]
    PersistDenied(String),

    /// The collection does not allow deleting entries.
    #[error("Not allowed to delete entries in collection '{0}'")]
    DeletionDenied(String),

    /// The backend refused the operation for the current user.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Draft data failed local validation; nothing was sent to the backend.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Reading or writing the local draft backup failed.
    #[error("Local backup failed: {0}")]
    BackupIo(String),

    /// A format codec could not decode or encode an entry.
    #[error("{format} error: {message}")]
    Format {
        /// Format name (e.g. `yaml`, `frontmatter`)
        format: String,
        /// Underlying codec message
        message: String,
    },

    /// A string template could not be compiled.
    #[error("Template error: {0}")]
    Template(String),

    /// The slug template references a date but none was available.
    #[error("Slug template requires a date but none was available")]
    MissingRequiredDate,

    /// The entry data has no value for the collection's identifier field.
    #[error(
        "Collection '{0}' must have a field name that is a valid entry identifier, or must have `identifier_field` set"
    )]
    MissingIdentifier(String),

    /// No backend factory is registered under the requested name.
    #[error("Backend not found: {0}")]
    UnknownBackend(String),

    /// No collection with the requested name exists in the configuration.
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Pagination cursor misuse (unsupported action or foreign envelope).
    #[error("Cursor error: {0}")]
    Cursor(String),

    /// The backend does not offer an optional capability.
    #[error("Operation not supported by backend '{backend}': {operation}")]
    Unsupported {
        /// Backend name
        backend: String,
        /// Capability that was requested
        operation: String,
    },

    /// A workflow transition was requested from the wrong status.
    #[error("Entry '{0}' is not ready to be published")]
    NotReady(String),

    /// The configuration is missing something the engine needs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Opaque provider failure.
    #[error("Backend error: {0}")]
    Backend(String),

    /// I/O error from a local store or the local backend.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl QuireError {
    /// Build a format error from any displayable codec error.
    pub fn format(format: impl Into<String>, err: impl std::fmt::Display) -> Self {
        QuireError::Format {
            format: format.into(),
            message: err.to_string(),
        }
    }

    /// Build an unsupported-capability error.
    pub fn unsupported(backend: impl Into<String>, operation: impl Into<String>) -> Self {
        QuireError::Unsupported {
            backend: backend.into(),
            operation: operation.into(),
        }
    }

    /// Whether this error means the requested content does not exist.
    ///
    /// Also true for I/O `NotFound` errors coming from local stores.
    pub fn is_not_found(&self) -> bool {
        match self {
            QuireError::NotFound(_) => true,
            QuireError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_covers_io_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(QuireError::from(io).is_not_found());
        assert!(QuireError::NotFound("posts/a.md".into()).is_not_found());
        assert!(!QuireError::AuthFailed("bad token".into()).is_not_found());
    }

    #[test]
    fn messages_name_the_collection() {
        let err = QuireError::PersistDenied("posts".into());
        assert_eq!(
            err.to_string(),
            "Not allowed to create new entries in collection 'posts'"
        );
    }
}
