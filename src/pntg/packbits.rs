//! PackBits run-length coding, one MacPaint scanline at a time.
//!
//! A control byte `n` read as signed means: `0..=127` copy the next
//! `n + 1` bytes literally, `-127..=-1` repeat the next byte `1 - n`
//! times, `-128` is a no-op. MacPaint scanlines decompress to exactly
//! 72 bytes.

use crate::error::Error;

/// Decompressed bytes per scanline: 576 pixels at one bit each.
pub const SCANLINE_LEN: usize = 72;

/// Longest compressed scanline this encoder produces.
pub const MAX_PACKED_LEN: usize = SCANLINE_LEN + 1;

/// Decompress one scanline from the front of `input`. Returns the 72
/// decompressed bytes and how many input bytes were consumed.
pub fn unpack_scanline(input: &[u8]) -> Result<([u8; SCANLINE_LEN], usize), Error> {
    let mut out = [0u8; SCANLINE_LEN];
    let mut produced = 0usize;
    let mut consumed = 0usize;
    while produced < SCANLINE_LEN {
        let control = *input
            .get(consumed)
            .ok_or(Error::Corrupted("scanline data ended mid-stream"))? as i8;
        consumed += 1;
        match control {
            -128 => {}
            0..=127 => {
                let count = control as usize + 1;
                let literal = input
                    .get(consumed..consumed + count)
                    .ok_or(Error::Corrupted("scanline data ended mid-stream"))?;
                consumed += count;
                if produced + count > SCANLINE_LEN {
                    return Err(Error::Corrupted("scanline overran 72 bytes"));
                }
                out[produced..produced + count].copy_from_slice(literal);
                produced += count;
            }
            _ => {
                let count = (1 - isize::from(control)) as usize;
                let byte = *input
                    .get(consumed)
                    .ok_or(Error::Corrupted("scanline data ended mid-stream"))?;
                consumed += 1;
                if produced + count > SCANLINE_LEN {
                    return Err(Error::Corrupted("scanline overran 72 bytes"));
                }
                out[produced..produced + count].fill(byte);
                produced += count;
            }
        }
    }
    Ok((out, consumed))
}

/// Compress one 72-byte scanline.
///
/// Runs of two identical bytes ride inside surrounding literals; only
/// runs of three or more become repeat packets. That keeps the output
/// within 73 bytes for every possible input.
pub fn pack_scanline(line: &[u8; SCANLINE_LEN]) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_PACKED_LEN);
    let mut pos = 0usize;
    while pos < SCANLINE_LEN {
        let run = run_length(line, pos).min(128);
        if run >= 2 {
            out.push((1 - run as i32) as i8 as u8);
            out.push(line[pos]);
            pos += run;
        } else {
            // Accumulate a literal until a run of 3+, end of line, or the
            // 128-byte packet cap. Pairs stay literal: splitting them out
            // costs a byte each time, which is what would break the
            // 73-byte bound.
            let start = pos;
            pos += 1;
            while pos < SCANLINE_LEN && pos - start < 128 && run_length(line, pos) < 3 {
                pos += 1;
            }
            out.push((pos - start - 1) as u8);
            out.extend_from_slice(&line[start..pos]);
        }
    }
    out
}

/// Length of the run of identical bytes starting at `pos`.
fn run_length(line: &[u8; SCANLINE_LEN], pos: usize) -> usize {
    let byte = line[pos];
    line[pos..].iter().take_while(|&&b| b == byte).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_solid_line() {
        let line = [0u8; SCANLINE_LEN];
        let packed = pack_scanline(&line);
        // A 72-byte run is the 2-byte packet [-71, 0]
        assert_eq!(packed, vec![(-71i8) as u8, 0x00]);
        let (unpacked, consumed) = unpack_scanline(&packed).unwrap();
        assert_eq!(unpacked, line);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_pack_distinct_line() {
        let mut line = [0u8; SCANLINE_LEN];
        for (index, byte) in line.iter_mut().enumerate() {
            *byte = index as u8;
        }
        let packed = pack_scanline(&line);
        assert_eq!(packed.len(), MAX_PACKED_LEN);
        assert_eq!(packed[0], 71);
        let (unpacked, _) = unpack_scanline(&packed).unwrap();
        assert_eq!(unpacked, line);
    }

    #[test]
    fn test_no_op_control_skipped() {
        let mut input = vec![(-128i8) as u8];
        input.extend_from_slice(&[(-71i8) as u8, 0xAB]);
        let (unpacked, consumed) = unpack_scanline(&input).unwrap();
        assert_eq!(unpacked, [0xAB; SCANLINE_LEN]);
        assert_eq!(consumed, 3);
    }

    #[test]
    fn test_unpack_overrun_rejected() {
        // 72 bytes of run then one more literal byte would overflow, but
        // decoding stops at exactly 72 — instead make the run itself too long
        let input = [(-72i8) as u8, 0x00]; // 73-byte run
        assert!(matches!(unpack_scanline(&input), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_unpack_truncated_rejected() {
        // Claims an 11-byte literal but provides 2
        let input = [10u8, 0x01, 0x02];
        assert!(matches!(unpack_scanline(&input), Err(Error::Corrupted(_))));
        assert!(matches!(unpack_scanline(&[]), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_roundtrip_all_inputs_bounded() {
        // A deterministic spread of line shapes: runs, alternations, noise
        let mut seed = 0x2545_F491u32;
        for case in 0..200 {
            let mut line = [0u8; SCANLINE_LEN];
            for byte in line.iter_mut() {
                // xorshift
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                *byte = match case % 4 {
                    0 => (seed % 2) as u8 * 0xFF,
                    1 => (seed % 4) as u8,
                    2 => (seed & 0xFF) as u8,
                    _ => ((seed % 3) * 0x33) as u8,
                };
            }
            let packed = pack_scanline(&line);
            assert!(packed.len() <= MAX_PACKED_LEN, "case {case}: {}", packed.len());
            let (unpacked, consumed) = unpack_scanline(&packed).unwrap();
            assert_eq!(unpacked, line, "case {case}");
            assert_eq!(consumed, packed.len(), "case {case}");
        }
    }

    #[test]
    fn test_two_byte_repeat_rides_inside_literal() {
        // a b b c … — breaking the literal for "bb" would blow the bound
        let mut line = [0u8; SCANLINE_LEN];
        for (index, byte) in line.iter_mut().enumerate() {
            *byte = match index % 3 {
                0 => 0x41,
                _ => 0x42,
            };
        }
        let packed = pack_scanline(&line);
        assert!(packed.len() <= MAX_PACKED_LEN, "{}", packed.len());
        let (unpacked, _) = unpack_scanline(&packed).unwrap();
        assert_eq!(unpacked, line);
    }
}
