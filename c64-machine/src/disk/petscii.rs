//! PETSCII conversions for file and disk names.

/// Padding byte after names in directory entries and the BAM.
pub const SHIFTED_SPACE: u8 = 0xA0;

/// Convert a PETSCII character to ASCII (upper case).
pub fn petscii_to_ascii(c: u8) -> char {
    match c {
        0x00..=0x1F => ' ',
        0x20..=0x5F => c as char,
        0x60 => '-',
        0x61..=0x7A => (c - 0x20) as char,
        0x7B..=0x7F => c as char,
        0x80..=0x9F => ' ',
        0xA0 => ' ',
        0xC1..=0xDA => (c - 0x80) as char,
        _ => '?',
    }
}

/// Convert an ASCII character to unshifted PETSCII.
pub fn ascii_to_petscii(c: char) -> u8 {
    match c {
        'a'..='z' => c.to_ascii_uppercase() as u8,
        ' '..='_' => c as u8,
        _ => b'?',
    }
}

/// Decode a padded name field, stopping at the first pad or NUL.
pub fn decode_name(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != SHIFTED_SPACE && b != 0)
        .map(|&b| petscii_to_ascii(b))
        .collect()
}

/// Encode `name` into a 16 byte field padded with shifted spaces.
pub fn encode_name(name: &str) -> [u8; 16] {
    let mut field = [SHIFTED_SPACE; 16];
    for (slot, c) in field.iter_mut().zip(name.chars()) {
        *slot = ascii_to_petscii(c);
    }
    field
}

/// Decode raw bytes sent by the computer (filenames, commands).
pub fn decode_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| petscii_to_ascii(b)).collect()
}
