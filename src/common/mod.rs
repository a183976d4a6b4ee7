//! Supporting utility types shared across the crate.
mod bytestr;
pub use bytestr::ByteStr;

/// Create a unit-struct error type with a fixed message.
///
/// # Example
///
/// ```ignore
/// unit_error! {
///     /// Row requested but not found.
///     pub struct RowNotFound("row not found");
/// }
/// ```
macro_rules! unit_error {
    ($(#[$meta:meta])* $vis:vis struct $name:ident($msg:literal);) => {
        $(#[$meta])*
        $vis struct $name;

        impl std::error::Error for $name { }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($msg)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "\"{self}\"")
            }
        }
    };
}

/// Trace a wire-level event when the `verbose` feature is enabled.
macro_rules! verbose {
    ($($tt:tt)*) => {
        #[cfg(feature = "verbose")]
        tracing::trace!($($tt)*)
    };
}

/// Log a connection lifecycle event when the `log` feature is enabled.
macro_rules! conn_log {
    ($lvl:ident, $($tt:tt)*) => {
        #[cfg(feature = "log")]
        log::$lvl!($($tt)*)
    };
}

pub(crate) use unit_error;
pub(crate) use verbose;
pub(crate) use conn_log;
