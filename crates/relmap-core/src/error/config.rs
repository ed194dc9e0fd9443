use super::Error;

/// Error when a configuration option name or value is invalid.
///
/// Configuration is validated when it is built, so these errors surface
/// at setup time and never at first use.
#[derive(Debug)]
pub(super) struct ConfigError {
    option: Box<str>,
    reason: Box<str>,
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "invalid config option `{}`: {}",
            self.option, self.reason
        )
    }
}

impl Error {
    /// Creates a configuration error for the named option.
    pub fn config(option: impl Into<String>, reason: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Config(ConfigError {
            option: option.into().into(),
            reason: reason.into().into(),
        }))
    }

    /// Returns `true` if this error is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Config(_))
    }
}
