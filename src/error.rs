//! The crate's error type.
use std::{backtrace::Backtrace, fmt, io};

use crate::{
    config::ConfigError,
    protocol::{ErrorResponse, ProtocolError},
    result::{DecodeError, RowNotFound},
};

/// A specialized [`Result`] for this crate's operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any error this crate can produce.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Attach a short description of what operation was being attempted,
    /// prefixed onto the rendered error.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// The specific failure behind an [`Error`].
pub enum ErrorKind {
    Config(ConfigError),
    Protocol(ProtocolError),
    Io(io::Error),
    Database(ErrorResponse),
    /// The server refused (or this build can't perform) a TLS upgrade.
    Ssl(SslError),
    UnsupportedAuth { code: u32 },
    Utf8(std::str::Utf8Error),
    RowNotFound(RowNotFound),
    EmptyQuery,
    Decode(DecodeError),
}

/// Why a TLS upgrade did not happen.
pub enum SslError {
    /// The server answered the `SSLRequest` preamble with `N`.
    Refused,
    /// `Config::use_tls(true)` was set but the `ssl` feature is disabled.
    FeatureDisabled,
}

impl fmt::Display for SslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refused => write!(f, "server refused to negotiate TLS"),
            Self::FeatureDisabled => write!(f, "TLS requested but the `ssl` feature is not enabled"),
        }
    }
}

macro_rules! from {
    (<$ty:ty> $pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                Self { context: String::new(), backtrace: Backtrace::capture(), kind: $body }
            }
        }
    };
}

from!(<ErrorKind> e => e);
from!(<ConfigError> e => ErrorKind::Config(e));
from!(<ProtocolError> e => ErrorKind::Protocol(e));
from!(<io::Error> e => ErrorKind::Io(e));
from!(<ErrorResponse> e => ErrorKind::Database(e));
from!(<std::str::Utf8Error> e => ErrorKind::Utf8(e));
from!(<RowNotFound> e => ErrorKind::RowNotFound(e));
from!(<DecodeError> e => ErrorKind::Decode(e));

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\nStack backtrace:\n")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{backtrace}")?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Protocol(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
            Self::Database(e) => write!(f, "{}: {}", e.code(), e.message()),
            Self::Ssl(e) => e.fmt(f),
            Self::UnsupportedAuth { code } => write!(f, "server requested unsupported authentication method {code}"),
            Self::Utf8(e) => e.fmt(f),
            Self::RowNotFound(e) => e.fmt(f),
            Self::EmptyQuery => write!(f, "query string was empty"),
            Self::Decode(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
