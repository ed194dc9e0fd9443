use super::Error;

/// A lookup by key matched no row.
#[derive(Debug)]
pub(super) struct RecordNotFoundError {
    what: Box<str>,
}

impl std::error::Error for RecordNotFoundError {}

impl core::fmt::Display for RecordNotFoundError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "record not found: {}", self.what)
    }
}

impl Error {
    /// `what` describes the missing record, e.g. `Contact with key 4`.
    pub fn record_not_found(what: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::RecordNotFound(RecordNotFoundError {
            what: what.into().into(),
        }))
    }

    pub fn is_record_not_found(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::RecordNotFound(_))
    }
}
