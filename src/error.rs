//! Common error types used throughout the crate.

use std::fmt;

use anybytes::view::ViewError;

/// Result type used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type covering failures across grambit data structures.
#[derive(Debug)]
pub enum Error {
    /// An argument or configuration value violated preconditions.
    InvalidArgument(String),
    /// Deserialized metadata was malformed or inconsistent.
    InvalidMetadata(String),
    /// The perfect hash function could not be constructed.
    Construction(String),
    /// Wrapper around [`std::io::Error`] values.
    Io(std::io::Error),
    /// Wrapper around [`anybytes::view::ViewError`] values.
    View(ViewError),
}

impl Error {
    /// Creates an [`Error::InvalidArgument`] with the provided message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates an [`Error::InvalidMetadata`] with the provided message.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Creates an [`Error::Construction`] with the provided message.
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "{msg}"),
            Error::InvalidMetadata(msg) => write!(f, "{msg}"),
            Error::Construction(msg) => write!(f, "{msg}"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::View(err) => write!(f, "view error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidArgument(_) | Error::InvalidMetadata(_) | Error::Construction(_) => None,
            Error::Io(err) => Some(err),
            Error::View(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ViewError> for Error {
    fn from(err: ViewError) -> Self {
        Error::View(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_passes_messages_through() {
        let e = Error::invalid_argument("width must be in 1..=64, but got 0.");
        assert_eq!(e.to_string(), "width must be in 1..=64, but got 0.");
        let e = Error::construction("duplicate key");
        assert_eq!(e.to_string(), "duplicate key");
    }

    #[test]
    fn io_errors_keep_their_source() {
        let e: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(e.to_string().starts_with("I/O error: "));
        assert!(std::error::Error::source(&e).is_some());
    }
}
