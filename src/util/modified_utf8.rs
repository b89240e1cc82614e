/// Check bytes against the classfile's modified UTF-8 grammar
///
/// Embedded zero bytes are rejected (the null character is encoded as two bytes), as are stray
/// continuation bytes, 4-byte sequences, and sequences cut short by the end of the input.
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.4.7>
pub fn is_valid_modified_utf8(bytes: &[u8]) -> bool {
    let is_continuation = |b: u8| b & 0xC0 == 0x80;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c >> 4 {
            _ if c == 0 => return false,
            0x0..=0x7 => (),
            0x8..=0xB | 0xF => return false,

            // 110xxxxx 10xxxxxx
            0xC | 0xD => {
                i += 1;
                if i >= bytes.len() || !is_continuation(bytes[i]) {
                    return false;
                }
            }

            // 1110xxxx 10xxxxxx 10xxxxxx
            _ => {
                i += 2;
                if i >= bytes.len() || !is_continuation(bytes[i - 1]) || !is_continuation(bytes[i])
                {
                    return false;
                }
            }
        }
        i += 1;
    }
    true
}

/// Encode a string in modified UTF-8
///
/// This differs from standard UTF-8 in how the null character and supplementary characters are
/// encoded (the former as two bytes, the latter as a surrogate pair of 3-byte sequences).
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = vec![];
    for c in string.chars() {
        let len: usize = if c == '\u{0000}' { 2 } else { c.len_utf8() };
        let code: u32 = c as u32;

        match len {
            1 => buffer.push(code as u8),
            2 => {
                buffer.push((code >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            3 => {
                buffer.push((code >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((code >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            _ => {
                buffer.push(0b1110_1101);
                buffer.push(((code >> 16 & 0x0F) as u8).wrapping_sub(1) & 0x0F | 0b1010_0000);
                buffer.push((code >> 10 & 0x3F) as u8 | 0b1000_0000);

                buffer.push(0b1110_1101);
                buffer.push(((code >> 6 & 0x0F) as u8) | 0b1011_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}

/// Decode modified UTF-8 into a string, for diagnostics and display
///
/// Surrogate pairs are recombined. Anything that does not decode (including lone surrogates) is
/// replaced with `U+FFFD`.
pub fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as u16;
        let unit = match c >> 4 {
            0x0..=0x7 => {
                i += 1;
                Some(c)
            }
            0xC | 0xD if i + 1 < bytes.len() => {
                let unit = (c & 0x1F) << 6 | (bytes[i + 1] as u16 & 0x3F);
                i += 2;
                Some(unit)
            }
            0xE if i + 2 < bytes.len() => {
                let unit = (c & 0x0F) << 12
                    | (bytes[i + 1] as u16 & 0x3F) << 6
                    | (bytes[i + 2] as u16 & 0x3F);
                i += 3;
                Some(unit)
            }
            _ => {
                i += 1;
                None
            }
        };
        units.push(unit.unwrap_or(0xFFFD));
    }
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
