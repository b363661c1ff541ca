//! Monochromisation strategies.
//!
//! Each strategy reduces an 8-bit grayscale raster to packed 1-bit
//! monochrome: one byte per 8 pixels, MSB leftmost, `1` black, `0`
//! white. Inputs are never mutated; the error-diffusing strategies do
//! their accumulation in a widened working buffer.

use log::warn;

/// 4×4 Bayer threshold matrix.
const BAYER_4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// 2×2 Bayer threshold matrix.
const BAYER_2: [[u8; 2]; 2] = [[0, 2], [3, 1]];

/// 8×8 Bayer threshold matrix.
#[rustfmt::skip]
const BAYER_8: [[u8; 8]; 8] = [
    [ 0, 32,  8, 40,  2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44,  4, 36, 14, 46,  6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [ 3, 35, 11, 43,  1, 33,  9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47,  7, 39, 13, 45,  5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// A monochromisation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dither {
    /// Fixed threshold: pixels darker than the cutoff become black.
    Threshold {
        /// The cutoff; the conventional default is 128
        value: u8,
    },
    /// Floyd–Steinberg error diffusion.
    FloydSteinberg,
    /// Atkinson error diffusion (diffuses six eighths of the error).
    Atkinson,
    /// Ordered dithering with a Bayer matrix of the given size.
    Bayer {
        /// Matrix size: 2, 4 or 8. Other sizes fall back to 4.
        size: u8,
    },
}

impl Default for Dither {
    fn default() -> Dither {
        Dither::Threshold { value: 128 }
    }
}

impl Dither {
    /// Reduce a `width × height` grayscale buffer to packed 1-bit rows.
    /// `width` must be a multiple of 8; the output holds
    /// `width / 8 × height` bytes.
    pub fn apply(&self, gray: &[u8], width: usize, height: usize) -> Vec<u8> {
        debug_assert_eq!(gray.len(), width * height);
        debug_assert_eq!(width % 8, 0);
        match *self {
            Dither::Threshold { value } => threshold(gray, width, height, value),
            Dither::FloydSteinberg => diffuse(gray, width, height, &FLOYD_STEINBERG_KERNEL),
            Dither::Atkinson => diffuse(gray, width, height, &ATKINSON_KERNEL),
            Dither::Bayer { size } => bayer(gray, width, height, size),
        }
    }
}

/// Pack a row predicate into MSB-first bytes.
fn pack<F: FnMut(usize, usize) -> bool>(width: usize, height: usize, mut is_black: F) -> Vec<u8> {
    let mut packed = vec![0u8; width / 8 * height];
    for y in 0..height {
        for x in 0..width {
            if is_black(x, y) {
                packed[y * (width / 8) + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    packed
}

fn threshold(gray: &[u8], width: usize, height: usize, value: u8) -> Vec<u8> {
    pack(width, height, |x, y| gray[y * width + x] < value)
}

fn bayer(gray: &[u8], width: usize, height: usize, size: u8) -> Vec<u8> {
    let size = match size {
        2 | 4 | 8 => size,
        other => {
            warn!("unsupported Bayer matrix size {other}, falling back to 4");
            4
        }
    };
    let cell = |x: usize, y: usize| -> u16 {
        u16::from(match size {
            2 => BAYER_2[y % 2][x % 2],
            4 => BAYER_4[y % 4][x % 4],
            _ => BAYER_8[y % 8][x % 8],
        })
    };
    let levels = u16::from(size) * u16::from(size);
    // gs / 255 <= M / size² without leaving integer arithmetic
    pack(width, height, |x, y| {
        u16::from(gray[y * width + x]) * levels <= cell(x, y) * 255
    })
}

/// An error-diffusion kernel: relative targets and their share of the
/// quantisation error, as a numerator over `denominator`.
struct DiffusionKernel {
    targets: &'static [(isize, isize, i32)],
    denominator: i32,
}

static FLOYD_STEINBERG_KERNEL: DiffusionKernel = DiffusionKernel {
    targets: &[(1, 0, 7), (-1, 1, 3), (0, 1, 5), (1, 1, 1)],
    denominator: 16,
};

static ATKINSON_KERNEL: DiffusionKernel = DiffusionKernel {
    targets: &[(1, 0, 1), (2, 0, 1), (-1, 1, 1), (0, 1, 1), (1, 1, 1), (0, 2, 1)],
    denominator: 8,
};

fn diffuse(gray: &[u8], width: usize, height: usize, kernel: &DiffusionKernel) -> Vec<u8> {
    // Accumulated error pushes values outside 0..=255, so work widened
    let mut work: Vec<i32> = gray.iter().map(|&g| i32::from(g)).collect();
    let mut packed = vec![0u8; width / 8 * height];
    for y in 0..height {
        for x in 0..width {
            let old = work[y * width + x];
            let black = old < 128;
            let quantised = if black { 0 } else { 255 };
            if black {
                packed[y * (width / 8) + x / 8] |= 0x80 >> (x % 8);
            }
            let error = old - quantised;
            for &(dx, dy, share) in kernel.targets {
                let tx = x as isize + dx;
                let ty = y as isize + dy;
                if tx >= 0 && (tx as usize) < width && (ty as usize) < height {
                    work[ty as usize * width + tx as usize] +=
                        error * share / kernel.denominator;
                }
            }
        }
    }
    packed
}
