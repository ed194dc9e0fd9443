use super::Error;
use crate::Params;

/// Error when the storage collaborator fails to execute a statement.
///
/// The attempted SQL and its bound parameters are kept for diagnostics.
#[derive(Debug)]
pub(super) struct StorageError {
    sql: Box<str>,
    params: Params,
    cause: Error,
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "storage failed to execute `{}`", self.sql)?;
        if !self.params.is_empty() {
            f.write_str(" with params {")?;
            for (i, (name, value)) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}: {value}")?;
            }
            f.write_str("}")?;
        }
        write!(f, ": {}", self.cause)
    }
}

impl Error {
    /// Wraps a storage failure together with the statement that caused it.
    pub fn storage(sql: impl Into<String>, params: &Params, cause: Error) -> Error {
        Error::from(super::ErrorKind::Storage(StorageError {
            sql: sql.into().into(),
            params: params.clone(),
            cause,
        }))
    }

    /// Returns `true` if this error is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Storage(_))
    }
}
