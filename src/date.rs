//! MFS timestamps.
//!
//! MFS stores dates as unsigned seconds since midnight UTC on
//! 1904-01-01. A stored zero means "no date".

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds from the Mac epoch (1904-01-01) to the Unix epoch (1970-01-01):
/// 66 years of which 17 are leap years.
pub const EPOCH_OFFSET: i64 = 2_082_844_800;

/// Convert an on-disk date field to seconds since the Mac epoch.
/// Zero is the null date.
pub fn from_field(field: u32) -> Option<u32> {
    (field != 0).then_some(field)
}

/// Convert an optional Mac-epoch date back to its on-disk field.
pub fn to_field(date: Option<u32>) -> u32 {
    date.unwrap_or(0)
}

/// Seconds since the Mac epoch for a Unix timestamp.
pub fn from_unix(unix_seconds: i64) -> u32 {
    let mac = unix_seconds + EPOCH_OFFSET;
    mac.clamp(0, i64::from(u32::MAX)) as u32
}

/// Unix timestamp for a Mac-epoch date.
pub fn to_unix(mac_seconds: u32) -> i64 {
    i64::from(mac_seconds) - EPOCH_OFFSET
}

/// The wall clock, as seconds since the Mac epoch.
pub fn now() -> u32 {
    let unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    from_unix(unix)
}
