mod config;
mod mapping;
mod query;
mod record_not_found;
mod storage;
mod type_conversion;

use config::ConfigError;
use mapping::MappingError;
use query::QueryError;
use record_not_found::RecordNotFoundError;
use std::sync::Arc;
use storage::StorageError;
use type_conversion::TypeConversionError;

/// An error raised while mapping, querying or persisting entities.
///
/// Cloning is cheap; the error is a single pointer wide.
#[derive(Clone)]
pub struct Error {
    kind: Arc<ErrorKind>,
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Config(ConfigError),
    Mapping(MappingError),
    Query(QueryError),
    RecordNotFound(RecordNotFoundError),
    Storage(StorageError),
    TypeConversion(TypeConversionError),
}

impl Error {
    fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            ErrorKind::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self.kind() {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Config(err) => core::fmt::Display::fmt(err, f),
            Mapping(err) => core::fmt::Display::fmt(err, f),
            Query(err) => core::fmt::Display::fmt(err, f),
            RecordNotFound(err) => core::fmt::Display::fmt(err, f),
            Storage(err) => core::fmt::Display::fmt(err, f),
            TypeConversion(err) => core::fmt::Display::fmt(err, f),
        }
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if f.alternate() {
            f.debug_struct("Error").field("kind", self.kind()).finish()
        } else {
            core::fmt::Display::fmt(self, f)
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            kind: Arc::new(kind),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

/// Mapping cache entries are JSON.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}
