use thiserror::Error;

/// A handle into the stream's handle table. See [`crate::handle`].
pub type Handle = u32;

/// The error type produced by this crate's decoder.
///
/// Every variant carries the stream offset at which the failure was
/// detected, and, where meaningful, the class name or handle involved.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("bad magic at offset {position}: stream does not start with AC ED")]
    BadMagic { position: u64 },

    #[error("unsupported stream version at offset {position}")]
    UnsupportedVersion { position: u64 },

    #[error("truncated stream at offset {position}: needed {needed} more byte(s)")]
    TruncatedStream { position: u64, needed: usize },

    #[error("unknown content tag 0x{tag:02x} at offset {position}")]
    UnknownTag { tag: u8, position: u64 },

    #[error("reference to unassigned handle {handle:#x} at offset {position}")]
    BadHandle { handle: Handle, position: u64 },

    #[error("bad field/array type code {code:?} at offset {position}")]
    BadTypeCode { code: u8, position: u64 },

    #[error("invalid modified UTF-8 at offset {position}")]
    InvalidUtf8 { position: u64 },

    #[error("recursion depth limit exceeded at offset {position}")]
    DepthLimitExceeded { position: u64 },

    #[error("externalizable class `{class_name}` has no registered handler (offset {position})")]
    UnsupportedExternalizable { class_name: String, position: u64 },

    #[error("inconsistent class descriptor at offset {position}: {detail}")]
    InconsistentDescriptor { detail: String, position: u64 },

    #[error("I/O error at offset {position}: {source}")]
    Io {
        position: u64,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// The stream offset at which this error was detected.
    pub fn position(&self) -> u64 {
        match self {
            Error::BadMagic { position }
            | Error::UnsupportedVersion { position }
            | Error::TruncatedStream { position, .. }
            | Error::UnknownTag { position, .. }
            | Error::BadHandle { position, .. }
            | Error::BadTypeCode { position, .. }
            | Error::InvalidUtf8 { position }
            | Error::DepthLimitExceeded { position }
            | Error::UnsupportedExternalizable { position, .. }
            | Error::InconsistentDescriptor { position, .. }
            | Error::Io { position, .. } => *position,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
