//! Reading and writing of binary data.
//!
//! Everything MFS and MacPaint put on disk is big-endian; strings are
//! Pascal strings (a length byte followed by that many raw bytes).

pub(crate) mod read;
pub(crate) mod write;
