//! Catalog error model.
//! Every extractor and the identifier resolver return `CatalogResult<T>`; a
//! failure anywhere in a call discards the partial result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogError {
    /// Query execution or transport failure, surfaced verbatim.
    #[error("connection_error: {message}")]
    Connection { message: String },
    #[error("not_found: no {kind} named {name}")]
    NotFound { kind: String, name: String },
    /// More than one catalog row matched a lookup that must be unique.
    #[error("ambiguous: {matches} {kind} objects match {name}")]
    Ambiguous { kind: String, name: String, matches: usize },
    /// A row could not be decoded into its record shape.
    #[error("mapping_error: column '{column}': {message}")]
    Mapping { column: String, message: String },
    #[error("invalid_lookup: {message}")]
    InvalidLookup { message: String },
    #[error("unsupported_version: server version {version} predates operator families")]
    UnsupportedVersion { version: i32 },
}

impl CatalogError {
    pub fn code_str(&self) -> &'static str {
        match self {
            CatalogError::Connection { .. } => "connection_error",
            CatalogError::NotFound { .. } => "not_found",
            CatalogError::Ambiguous { .. } => "ambiguous",
            CatalogError::Mapping { .. } => "mapping_error",
            CatalogError::InvalidLookup { .. } => "invalid_lookup",
            CatalogError::UnsupportedVersion { .. } => "unsupported_version",
        }
    }

    /// Only a failed lookup can be treated as "does not exist" by the caller;
    /// everything else ends the extraction pass.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }

    pub fn connection<S: Into<String>>(msg: S) -> Self { CatalogError::Connection { message: msg.into() } }
    pub fn not_found<S: Into<String>>(kind: S, name: S) -> Self { CatalogError::NotFound { kind: kind.into(), name: name.into() } }
    pub fn ambiguous<S: Into<String>>(kind: S, name: S, matches: usize) -> Self { CatalogError::Ambiguous { kind: kind.into(), name: name.into(), matches } }
    pub fn mapping<S: Into<String>>(column: S, msg: S) -> Self { CatalogError::Mapping { column: column.into(), message: msg.into() } }
    pub fn invalid_lookup<S: Into<String>>(msg: S) -> Self { CatalogError::InvalidLookup { message: msg.into() } }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<tokio_postgres::Error> for CatalogError {
    fn from(err: tokio_postgres::Error) -> Self {
        // Prefer the server's own message when the failure came back as an ErrorResponse
        match err.as_db_error() {
            Some(db) => CatalogError::Connection { message: format!("{}: {}", db.code().code(), db.message()) },
            None => CatalogError::Connection { message: err.to_string() },
        }
    }
}
