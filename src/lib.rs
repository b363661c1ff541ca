//! MFS disk images and MacPaint files
//!
//! Builds and dissects 400 KB Macintosh File System floppy images and the
//! MacPaint (PNTG) pictures that go on them: enough to assemble a disk of
//! 576×720 monochrome images that period emulators mount directly.
//!
//! ### Specifications:
//!
//! - [Inside Macintosh Volume II](https://archive.org/details/inside-macintosh-1992-1994/1985-inside_macintosh_ii/)
//!   — File Manager, Data Organization on Volumes
//! - [MacPaint document format](https://web.archive.org/web/20080705155158/http://developer.apple.com/technotes/pt/pt_24.html)
//!   (Technical Note PT24)
//! - [PackBits](https://web.archive.org/web/20080705155127/http://developer.apple.com/technotes/tn/tn1023.html)
//!   (Technical Note TN1023)

use core::fmt::{self, Display, Formatter};

pub(crate) mod binary;
pub mod date;
pub mod dither;
mod error;
pub mod macroman;
pub mod mfs;
pub mod pntg;
pub mod raster;

pub use crate::dither::Dither;
pub use crate::error::Error;
pub use crate::mfs::map::ChainWarning;
pub use crate::mfs::{FileInfo, FileMeta, FormatOptions, Fork, MfsVolume};
pub use crate::pntg::{PaintImage, WriteOptions};
pub use crate::raster::Raster;

/// A four-character code
///
/// A 32-bit number that typically holds 4 8-bit ASCII characters, used for
/// type and creator codes. Eg. 'PNTG' 'TEXT' 'MPNT' 'APPL'.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FourCC(pub u32);

impl FourCC {
    /// The code's four raw bytes.
    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(bytes: [u8; 4]) -> Self {
        FourCC(u32::from_be_bytes(bytes))
    }
}

impl TryFrom<&str> for FourCC {
    type Error = Error;

    /// Type and creator codes are exactly four Mac OS Roman characters.
    fn try_from(code: &str) -> Result<Self, Error> {
        let bytes =
            macroman::encode(code).ok_or(Error::InvalidArgument("code is not Mac OS Roman"))?;
        let bytes: [u8; 4] = bytes
            .try_into()
            .map_err(|_| Error::InvalidArgument("type and creator codes must be 4 characters"))?;
        Ok(FourCC::from(bytes))
    }
}

impl Display for FourCC {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().all(|c| c.is_ascii() && !c.is_ascii_control()) {
            let s = core::str::from_utf8(&bytes).unwrap(); // unwrap safe due to above check
            s.fmt(f)
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_from_str() {
        let code = FourCC::try_from("PNTG").unwrap();
        assert_eq!(code, FourCC(u32::from_be_bytes(*b"PNTG")));
        assert_eq!(code.to_string(), "PNTG");
    }

    #[test]
    fn test_fourcc_wrong_length() {
        assert!(FourCC::try_from("PNT").is_err());
        assert!(FourCC::try_from("PAINT").is_err());
    }

    #[test]
    fn test_fourcc_display_non_ascii() {
        assert_eq!(FourCC(0x0102_0304).to_string(), "0x01020304");
    }
}
