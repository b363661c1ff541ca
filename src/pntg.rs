//! The MacPaint (PNTG) document format.
//!
//! A PNTG file is a 512-byte header — a version word, 38 8×8 fill
//! pattern tiles, and padding — followed by 720 PackBits-compressed
//! 72-byte scanlines: a 576×720 monochrome raster. Files that travelled
//! through other systems often arrive wrapped in a 128-byte MacBinary
//! header, which the parser detects and skips.

pub mod packbits;

use log::warn;

use crate::binary::read::ReadScope;
use crate::binary::write::WriteCtxt;
use crate::dither::Dither;
use crate::error::Error;
use crate::raster::{CropRect, PadColor, Raster};

use packbits::SCANLINE_LEN;

/// Raster width in pixels.
pub const WIDTH: usize = 576;

/// Raster height in pixels (and scanline count).
pub const HEIGHT: usize = 720;

/// Size of the MacPaint header.
pub const HEADER_LEN: usize = 512;

/// Expected value of the header's version word.
pub const VERSION: u32 = 2;

/// Number of fill-pattern tiles in the header.
pub const PATTERN_COUNT: usize = 38;

/// The 38 8-byte fill-pattern tiles from a MacPaint header.
pub type Patterns = [[u8; 8]; PATTERN_COUNT];

/// Size of a MacBinary wrapper header.
const MACBINARY_LEN: usize = 128;

/// A decoded MacPaint document: the raster and its pattern tiles.
///
/// Pattern contents are opaque here; they are carried through untouched
/// so a parsed file can be rewritten without losing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintImage {
    /// The picture as RGBA (black and white pixels only after a parse)
    pub raster: Raster,
    /// Pattern tiles, when the image came from a parsed PNTG file
    pub patterns: Option<Patterns>,
}

/// Padding placement for [WriteOptions].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    /// Background colour
    pub color: PadColor,
    /// Where the source image's left edge lands
    pub x: usize,
    /// Where the source image's top edge lands
    pub y: usize,
}

/// Options controlling [PaintImage::write].
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Crop this rectangle out of the source first
    pub crop: Option<CropRect>,
    /// Pad a smaller image onto a 576×720 canvas instead of scaling it up
    pub padding: Option<Padding>,
    /// Pattern tiles to store; falls back to the image's own, then zeros
    pub patterns: Option<Patterns>,
    /// How to reduce the image to one bit per pixel
    pub dither: Dither,
}

/// The number of bytes a MacBinary wrapper occupies at the front of
/// `bytes`: 128 when the wrapper's signature fields check out (first byte
/// zero, a plausible filename length, type code `PNTG`), otherwise 0.
pub fn macbinary_offset(bytes: &[u8]) -> usize {
    let wrapped = bytes.len() >= MACBINARY_LEN
        && bytes[0] == 0x00
        && (1..=63).contains(&bytes[1])
        && &bytes[65..69] == b"PNTG";
    if wrapped {
        MACBINARY_LEN
    } else {
        0
    }
}

impl From<Raster> for PaintImage {
    fn from(raster: Raster) -> PaintImage {
        PaintImage {
            raster,
            patterns: None,
        }
    }
}

impl PaintImage {
    /// Parse a PNTG file, skipping a MacBinary wrapper when present.
    pub fn parse(bytes: &[u8]) -> Result<PaintImage, Error> {
        let data = &bytes[macbinary_offset(bytes)..];
        if data.len() < HEADER_LEN {
            return Err(Error::InvalidFormat("too short for the MacPaint header"));
        }

        let scope = ReadScope::new(data);
        let mut ctxt = scope.ctxt();
        let version = ctxt.read_u32be()?;
        if version != VERSION {
            warn!("unexpected MacPaint version word {version:#010x}");
        }
        let mut patterns = [[0u8; 8]; PATTERN_COUNT];
        for pattern in patterns.iter_mut() {
            *pattern = ctxt.read_array::<8>()?;
        }
        // The rest of the header is unused
        let _ = ctxt.read_slice(HEADER_LEN - ctxt.consumed())?;

        let mut raster = Raster::new(WIDTH, HEIGHT);
        let mut offset = HEADER_LEN;
        for y in 0..HEIGHT {
            let (line, consumed) = packbits::unpack_scanline(&data[offset..])?;
            offset += consumed;
            for x in 0..WIDTH {
                let black = line[x / 8] & (0x80 >> (x % 8)) != 0;
                let value = if black { 0 } else { 255 };
                raster.set_pixel(x, y, [value, value, value, 255]);
            }
        }

        Ok(PaintImage {
            raster,
            patterns: Some(patterns),
        })
    }

    /// Serialise to PNTG bytes: crop, pad and scale the raster onto the
    /// 576×720 canvas, dither it to monochrome, then emit the header and
    /// the compressed scanlines.
    pub fn write(&self, options: &WriteOptions) -> Result<Vec<u8>, Error> {
        let mut raster = match options.crop {
            Some(rect) => self.raster.crop(rect)?,
            None => self.raster.clone(),
        };
        if let Some(padding) = options.padding {
            if raster.width() <= WIDTH
                && raster.height() <= HEIGHT
                && (raster.width() < WIDTH || raster.height() < HEIGHT)
            {
                raster = raster.pad(WIDTH, HEIGHT, padding.color, padding.x, padding.y);
            }
        }
        if raster.width() != WIDTH || raster.height() != HEIGHT {
            raster = raster.scale_bilinear(WIDTH, HEIGHT)?;
        }

        let gray = raster.to_grayscale();
        let packed = options.dither.apply(&gray, WIDTH, HEIGHT);

        let patterns = options
            .patterns
            .or(self.patterns)
            .unwrap_or([[0u8; 8]; PATTERN_COUNT]);

        let mut header = [0u8; HEADER_LEN];
        let mut ctxt = WriteCtxt::new(&mut header);
        ctxt.write_u32be(VERSION)?;
        for pattern in &patterns {
            ctxt.write_slice(pattern)?;
        }

        let mut out = Vec::with_capacity(HEADER_LEN + HEIGHT * SCANLINE_LEN / 4);
        out.extend_from_slice(&header);
        for y in 0..HEIGHT {
            let mut line = [0u8; SCANLINE_LEN];
            line.copy_from_slice(&packed[y * SCANLINE_LEN..(y + 1) * SCANLINE_LEN]);
            out.extend_from_slice(&packbits::pack_scanline(&line));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard() -> Raster {
        let mut raster = Raster::new(WIDTH, HEIGHT);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                if (x + y) % 2 == 0 {
                    raster.set_pixel(x, y, [0, 0, 0, 255]);
                }
            }
        }
        raster
    }

    #[test]
    fn test_roundtrip_monochrome_raster() {
        let image = PaintImage::from(checkerboard());
        let bytes = image.write(&WriteOptions::default()).unwrap();
        let parsed = PaintImage::parse(&bytes).unwrap();
        assert_eq!(parsed.raster, image.raster);
        assert_eq!(parsed.patterns, Some([[0u8; 8]; PATTERN_COUNT]));
    }

    #[test]
    fn test_patterns_carried_through() {
        let mut patterns = [[0u8; 8]; PATTERN_COUNT];
        patterns[0] = [0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x55, 0xAA, 0x55];
        let image = PaintImage::from(checkerboard());
        let options = WriteOptions {
            patterns: Some(patterns),
            ..Default::default()
        };
        let bytes = image.write(&options).unwrap();
        let parsed = PaintImage::parse(&bytes).unwrap();
        assert_eq!(parsed.patterns, Some(patterns));

        // A rewrite without an override keeps the parsed tiles
        let bytes = parsed.write(&WriteOptions::default()).unwrap();
        assert_eq!(PaintImage::parse(&bytes).unwrap().patterns, Some(patterns));
    }

    #[test]
    fn test_macbinary_wrapper_detected() {
        let image = PaintImage::from(checkerboard());
        let plain = image.write(&WriteOptions::default()).unwrap();

        let mut wrapped = vec![0u8; 128];
        wrapped[1] = 0x20;
        wrapped[65..69].copy_from_slice(b"PNTG");
        wrapped.extend_from_slice(&plain);

        assert_eq!(macbinary_offset(&wrapped), 128);
        assert_eq!(macbinary_offset(&plain), 0);
        assert_eq!(PaintImage::parse(&wrapped).unwrap().raster, image.raster);
    }

    #[test]
    fn test_short_input_rejected() {
        assert_eq!(
            PaintImage::parse(&[0u8; 100]),
            Err(Error::InvalidFormat("too short for the MacPaint header"))
        );
    }

    #[test]
    fn test_truncated_scanlines_rejected() {
        let image = PaintImage::from(checkerboard());
        let mut bytes = image.write(&WriteOptions::default()).unwrap();
        bytes.truncate(HEADER_LEN + 40);
        assert!(matches!(PaintImage::parse(&bytes), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_small_image_padded_not_scaled() {
        // An all-black quadrant placed at the origin of a white canvas
        let mut small = Raster::new(100, 100);
        for y in 0..100 {
            for x in 0..100 {
                small.set_pixel(x, y, [0, 0, 0, 255]);
            }
        }
        let options = WriteOptions {
            padding: Some(Padding::default()),
            ..Default::default()
        };
        let bytes = PaintImage::from(small).write(&options).unwrap();
        let parsed = PaintImage::parse(&bytes).unwrap();
        assert_eq!(parsed.raster.pixel(50, 50), [0, 0, 0, 255]);
        assert_eq!(parsed.raster.pixel(200, 50), [255, 255, 255, 255]);
        assert_eq!(parsed.raster.pixel(50, 200), [255, 255, 255, 255]);
    }

    #[test]
    fn test_oversize_image_scaled() {
        let big = Raster::new(WIDTH * 2, HEIGHT * 2);
        let bytes = PaintImage::from(big).write(&WriteOptions::default()).unwrap();
        let parsed = PaintImage::parse(&bytes).unwrap();
        assert_eq!(parsed.raster.width(), WIDTH);
        assert_eq!(parsed.raster.height(), HEIGHT);
    }

    #[test]
    fn test_crop_applied_first() {
        // Black left half, white right half; cropping the left half then
        // scaling yields an all-black page
        let mut raster = Raster::new(WIDTH, HEIGHT);
        for y in 0..HEIGHT {
            for x in 0..WIDTH / 2 {
                raster.set_pixel(x, y, [0, 0, 0, 255]);
            }
        }
        let options = WriteOptions {
            crop: Some(CropRect {
                x: 0,
                y: 0,
                width: WIDTH / 2,
                height: HEIGHT,
            }),
            ..Default::default()
        };
        let bytes = PaintImage::from(raster).write(&options).unwrap();
        let parsed = PaintImage::parse(&bytes).unwrap();
        assert_eq!(parsed.raster.pixel(500, 10), [0, 0, 0, 255]);
    }
}
