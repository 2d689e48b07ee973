use std::io;
use thiserror::Error;

pub const EXIT_OK: i32 = 0;
pub const EXIT_IO: i32 = 1;
pub const EXIT_NOT_FOUND: i32 = 2;
pub const EXIT_INVALID_PACKAGE: i32 = 4;
pub const EXIT_PERMISSION_DENIED: i32 = 5;
pub const EXIT_USAGE: i32 = 64;

/// Failures the installer and uninstaller report to their caller.
///
/// Plain filesystem failures travel as `io::Error` inside an `anyhow` chain and
/// are classified by [`classify`]; this enum covers the rest.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid package: {0}")]
    InvalidPackage(String),

    #[error("usage: {0}")]
    Usage(String),

    /// A filesystem step whose failure is reported as I/O whatever the OS
    /// said, access denied included.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    Io,
    NotFound,
    InvalidPackage,
    Usage,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::PermissionDenied => EXIT_PERMISSION_DENIED,
            ErrorKind::Io => EXIT_IO,
            ErrorKind::NotFound => EXIT_NOT_FOUND,
            ErrorKind::InvalidPackage => EXIT_INVALID_PACKAGE,
            ErrorKind::Usage => EXIT_USAGE,
        }
    }
}

impl SetupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SetupError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            SetupError::NotFound(_) => ErrorKind::NotFound,
            SetupError::InvalidPackage(_) => ErrorKind::InvalidPackage,
            SetupError::Usage(_) => ErrorKind::Usage,
            SetupError::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Walks the error chain and picks the first typed cause.
///
/// An `io::Error` reporting access denied counts as `PermissionDenied`; every
/// other I/O failure, and anything untyped, is `Io`.
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    for cause in err.chain() {
        if let Some(setup) = cause.downcast_ref::<SetupError>() {
            return setup.kind();
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return match io_err.kind() {
                io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                _ => ErrorKind::Io,
            };
        }
    }
    ErrorKind::Io
}
