use super::Error;

/// Error when mapping metadata is missing, contradictory, or refers to a
/// class or property that does not exist.
///
/// Outside of strict mode these errors are recorded on the mapping
/// collection and the affected property is left unmapped.
#[derive(Debug)]
pub(super) struct MappingError {
    class: Box<str>,
    property: Option<Box<str>>,
    message: Box<str>,
}

impl std::error::Error for MappingError {}

impl core::fmt::Display for MappingError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match &self.property {
            Some(property) => write!(
                f,
                "mapping error on {}::{}: {}",
                self.class, property, self.message
            ),
            None => write!(f, "mapping error on {}: {}", self.class, self.message),
        }
    }
}

impl Error {
    /// Creates a mapping error for a class, optionally naming the property.
    pub fn mapping(
        class: impl Into<String>,
        property: Option<&str>,
        message: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::Mapping(MappingError {
            class: class.into().into(),
            property: property.map(Into::into),
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a mapping error.
    pub fn is_mapping(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Mapping(_))
    }
}
