use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type BoxedSourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// A caller-supplied argument violates the operation's contract.
    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        ErrorKind::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
        .into()
    }

    /// Data read from a source disagrees with what the layout was planned for.
    pub fn invalid_data(element: impl Into<String>, message: impl Into<String>) -> Error {
        ErrorKind::InvalidFormat {
            element: element.into(),
            message: message.into(),
        }
        .into()
    }

    pub fn not_implemented(message: impl Into<String>) -> Error {
        ErrorKind::NotImplemented {
            message: message.into(),
        }
        .into()
    }

    pub fn unsupported_type(type_name: impl Into<String>) -> Error {
        ErrorKind::UnsupportedType {
            type_name: type_name.into(),
        }
        .into()
    }

    /// Encoded bytes differ in length from the planned layout. Always a bug.
    pub fn layout_mismatch(element: impl Into<String>, expected: u64, actual: u64) -> Error {
        ErrorKind::LayoutMismatch {
            element: element.into(),
            expected,
            actual,
        }
        .into()
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        ErrorKind::Io {
            context: context.into(),
            source,
        }
        .into()
    }

    pub fn parquet<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ErrorKind::Parquet {
            context: context.into(),
            source: Box::new(source),
        }
        .into()
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("not yet implemented: {message}")]
    NotImplemented { message: String },

    #[error("unsupported column type {type_name}")]
    UnsupportedType { type_name: String },

    #[error("invalid data for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("layout mismatch for '{element}': predicted {expected} bytes, produced {actual}")]
    LayoutMismatch {
        element: String,
        expected: u64,
        actual: u64,
    },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("Parquet error: {context}: {source}")]
    Parquet {
        context: String,
        source: BoxedSourceError,
    },

    #[error("destination buffer is too small")]
    DestBufferTooSmall,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Error {
        Error::io("io", source)
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        match e.into_kind() {
            ErrorKind::Io { source, .. } => source,
            kind @ (ErrorKind::InvalidArgument { .. } | ErrorKind::DestBufferTooSmall) => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, Error::from(kind))
            }
            kind @ ErrorKind::InvalidFormat { .. } => {
                std::io::Error::new(std::io::ErrorKind::InvalidData, Error::from(kind))
            }
            kind => std::io::Error::other(Error::from(kind)),
        }
    }
}
