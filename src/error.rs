use thiserror::Error;

/// The result type used throughout the `docwire` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in the `docwire` crate.
#[derive(Debug)]
#[non_exhaustive]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,

    /// The document key associated with the error, if any.
    pub key: Option<String>,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(key) = self.key.as_deref() {
            write!(f, "Error at key \"{key}\": ")?;
        }

        write!(f, "{}", self.kind)
    }
}

/// The types of errors that can occur in the `docwire` crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed bytes or a type-mismatched value were encountered during decode.
    #[error("Malformed BSON: {message}")]
    #[non_exhaustive]
    Format { message: String },

    /// Invalid caller input, e.g. a missing required identity field.
    #[error("Invalid argument: {message}")]
    #[non_exhaustive]
    Argument { message: String },

    /// An unsupported representation/configuration combination during encode.
    #[error("Serialization failed: {message}")]
    #[non_exhaustive]
    Serialization { message: String },

    /// Mechanism negotiation failed or the server reported a non-zero status
    /// code during an authentication conversation.
    #[error("Authentication failed: {message}")]
    #[non_exhaustive]
    Security {
        /// The server-reported status code, if the server got that far.
        code: Option<i32>,
        message: String,
    },

    /// A server reply was missing an expected field or carried the wrong type.
    #[error("Protocol violation: {message}")]
    #[non_exhaustive]
    Protocol { message: String },

    /// A [`std::io::Error`] occurred; surfaced unchanged from the transport.
    #[error("An IO error occurred: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, key: None }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        ErrorKind::Io(value).into()
    }
}

impl Error {
    pub(crate) fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub(crate) fn format(message: impl ToString) -> Self {
        ErrorKind::Format {
            message: message.to_string(),
        }
        .into()
    }

    pub(crate) fn argument(message: impl ToString) -> Self {
        ErrorKind::Argument {
            message: message.to_string(),
        }
        .into()
    }

    pub(crate) fn serialization(message: impl ToString) -> Self {
        ErrorKind::Serialization {
            message: message.to_string(),
        }
        .into()
    }

    pub(crate) fn security(message: impl ToString) -> Self {
        ErrorKind::Security {
            code: None,
            message: message.to_string(),
        }
        .into()
    }

    pub(crate) fn security_with_code(code: i32, message: impl ToString) -> Self {
        ErrorKind::Security {
            code: Some(code),
            message: message.to_string(),
        }
        .into()
    }

    pub(crate) fn protocol(message: impl ToString) -> Self {
        ErrorKind::Protocol {
            message: message.to_string(),
        }
        .into()
    }

    /// The value found did not have the type the caller asked for.
    pub(crate) fn unexpected_type(actual: &'static str, expected: &'static str) -> Self {
        Self::format(format!("expected {expected}, found {actual}"))
    }

    #[cfg(test)]
    pub(crate) fn is_format(&self) -> bool {
        matches!(self.kind, ErrorKind::Format { .. })
    }

    #[cfg(test)]
    pub(crate) fn is_security(&self) -> bool {
        matches!(self.kind, ErrorKind::Security { .. })
    }
}
