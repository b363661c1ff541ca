//! Mac OS Roman transcoding.
//!
//! MFS stores file and volume names as raw Mac OS Roman bytes. Lookups in
//! this crate compare those bytes directly; this module converts at the
//! API boundary — decoding for display, encoding `&str` arguments on the
//! way in.

/// Unicode equivalents of Mac OS Roman code points 128..=255.
#[rustfmt::skip]
const HIGH: [char; 128] = [
    'Ä', 'Å', 'Ç', 'É', 'Ñ', 'Ö', 'Ü', 'á', 'à', 'â', 'ä', 'ã', 'å', 'ç', 'é', 'è',
    'ê', 'ë', 'í', 'ì', 'î', 'ï', 'ñ', 'ó', 'ò', 'ô', 'ö', 'õ', 'ú', 'ù', 'û', 'ü',
    '†', '°', '¢', '£', '§', '•', '¶', 'ß', '®', '©', '™', '´', '¨', '≠', 'Æ', 'Ø',
    '∞', '±', '≤', '≥', '¥', 'µ', '∂', '∑', '∏', 'π', '∫', 'ª', 'º', 'Ω', 'æ', 'ø',
    '¿', '¡', '¬', '√', 'ƒ', '≈', '∆', '«', '»', '…', '\u{A0}', 'À', 'Ã', 'Õ', 'Œ', 'œ',
    '–', '—', '“', '”', '‘', '’', '÷', '◊', 'ÿ', 'Ÿ', '⁄', '¤', '‹', '›', 'ﬁ', 'ﬂ',
    '‡', '·', '‚', '„', '‰', 'Â', 'Ê', 'Á', 'Ë', 'È', 'Í', 'Î', 'Ï', 'Ì', 'Ó', 'Ô',
    '\u{F8FF}', 'Ò', 'Ú', 'Û', 'Ù', 'ı', 'ˆ', '˜', '¯', '˘', '˙', '˚', '¸', '˝', '˛', 'ˇ',
];

/// Converts a Mac OS Roman byte to a Unicode `char`.
pub fn macroman_to_char(macroman: u8) -> char {
    match macroman {
        0..=127 => macroman as char,
        _ => HIGH[usize::from(macroman - 128)],
    }
}

/// Converts a Unicode `char` to its Mac OS Roman byte.
///
/// Returns `None` if the character has no Mac OS Roman encoding.
pub fn char_to_macroman(c: char) -> Option<u8> {
    if c.is_ascii() {
        return Some(c as u8);
    }
    HIGH.iter()
        .position(|&high| high == c)
        .map(|index| (index + 128) as u8)
}

/// Decode raw Mac OS Roman bytes for display.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| macroman_to_char(b)).collect()
}

/// Encode a string as Mac OS Roman bytes.
///
/// Returns `None` if any character has no Mac OS Roman encoding.
pub fn encode(string: &str) -> Option<Vec<u8>> {
    string.chars().map(char_to_macroman).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(decode(b"Hello.txt"), "Hello.txt");
        assert_eq!(encode("Hello.txt").unwrap(), b"Hello.txt");
    }

    #[test]
    fn test_high_roundtrip() {
        for byte in 0u8..=255 {
            let c = macroman_to_char(byte);
            assert_eq!(char_to_macroman(c), Some(byte), "code point {}", byte);
        }
    }

    #[test]
    fn test_unencodable() {
        assert_eq!(char_to_macroman('λ'), None);
        assert_eq!(encode("bad λ name"), None);
    }

    #[test]
    fn test_display_decoding() {
        // "Café" the way a Mac wrote it
        assert_eq!(decode(&[b'C', b'a', b'f', 0x8E]), "Café");
    }
}
