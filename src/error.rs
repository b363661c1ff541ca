//! Error types

use thiserror::Error;

use crate::binary::read::ReadEof;
use crate::binary::write::WriteEof;

/// Errors reported by the volume engine and the MacPaint codec.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum Error {
    /// The MFS magic word did not match during parse
    #[error("not an MFS volume (bad signature)")]
    InvalidSignature,
    /// A supplied argument was outside the accepted range
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Not enough free allocation blocks for the requested chain
    #[error("disk full: {needed} blocks needed, {free} free")]
    DiskFull {
        /// Blocks the operation needed
        needed: u16,
        /// Blocks that were free
        free: u16,
    },
    /// No room left in the file directory for a new entry
    #[error("file directory is full")]
    DirectoryFull,
    /// No directory entry matches the supplied name
    #[error("file not found: {0}")]
    NotFound(String),
    /// An on-disk structure is inconsistent
    #[error("corrupted: {0}")]
    Corrupted(&'static str),
    /// The input is not a recognisable MacPaint file
    #[error("invalid MacPaint data: {0}")]
    InvalidFormat(&'static str),
}

impl From<ReadEof> for Error {
    fn from(_error: ReadEof) -> Self {
        Error::Corrupted("unexpected end of data")
    }
}

impl From<WriteEof> for Error {
    fn from(_error: WriteEof) -> Self {
        Error::Corrupted("write ran past the end of its region")
    }
}
