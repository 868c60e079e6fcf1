//! Compressed Unicode file names of RAR 1.5-4.x file headers.
//!
//! When `LHD_UNICODE` is set the name field holds the plain name, a NUL, and
//! an encoded stream that rebuilds the UTF-16 name using the plain name as a
//! dictionary. Each flag byte carries four 2-bit opcodes:
//!
//! | op | meaning |
//! |----|---------|
//! | 0 | next encoded byte, high byte 0 |
//! | 1 | next encoded byte, running high byte |
//! | 2 | two encoded bytes, low then high |
//! | 3 | copy a run from the plain name, optionally shifted by a delta |

struct Decoder<'a> {
    std_name: &'a [u8],
    enc_data: &'a [u8],
    std_pos: usize,
    enc_pos: usize,
    failed: bool,
    output: Vec<u8>,
}

impl Decoder<'_> {
    fn enc_byte(&mut self) -> u8 {
        let byte = match self.enc_data.get(self.enc_pos) {
            Some(&b) => b,
            None => {
                self.failed = true;
                0
            }
        };
        self.enc_pos += 1;
        byte
    }

    fn std_byte(&mut self) -> u8 {
        match self.std_name.get(self.std_pos) {
            Some(&b) => b,
            None => {
                self.failed = true;
                b'?'
            }
        }
    }

    fn put(&mut self, low: u8, high: u8) {
        self.output.push(low);
        self.output.push(high);
        self.std_pos += 1;
    }

    fn run(mut self) -> Option<Vec<u8>> {
        let high_byte = self.enc_byte();
        let mut flags = 0u8;
        let mut flag_bits = 0u32;

        while self.enc_pos < self.enc_data.len() {
            if flag_bits == 0 {
                flags = self.enc_byte();
                flag_bits = 8;
            }
            flag_bits -= 2;

            match (flags >> flag_bits) & 3 {
                0 => {
                    let low = self.enc_byte();
                    self.put(low, 0);
                }
                1 => {
                    let low = self.enc_byte();
                    self.put(low, high_byte);
                }
                2 => {
                    let low = self.enc_byte();
                    let high = self.enc_byte();
                    self.put(low, high);
                }
                _ => {
                    let n = self.enc_byte();
                    if n & 0x80 != 0 {
                        let delta = self.enc_byte();
                        for _ in 0..(usize::from(n & 0x7F) + 2) {
                            let low = self.std_byte().wrapping_add(delta);
                            self.put(low, high_byte);
                        }
                    } else {
                        for _ in 0..(usize::from(n) + 2) {
                            let low = self.std_byte();
                            self.put(low, 0);
                        }
                    }
                }
            }
        }

        if self.failed {
            None
        } else {
            Some(self.output)
        }
    }
}

/// Rebuild the UTF-16LE bytes of a name. `None` when either input runs out,
/// in which case the caller keeps the plain name.
pub fn decode_utf16le(std_name: &[u8], enc_data: &[u8]) -> Option<Vec<u8>> {
    Decoder {
        std_name,
        enc_data,
        std_pos: 0,
        enc_pos: 0,
        failed: false,
        output: Vec::with_capacity(std_name.len() * 2),
    }
    .run()
}

/// Decode the raw name field of a file header carrying `LHD_UNICODE`.
///
/// Falls back to the plain part of the field when decoding fails.
pub fn decode_unicode_name(name_field: &[u8]) -> String {
    let (std_name, enc_data) = match name_field.iter().position(|&b| b == 0) {
        Some(nul) => (&name_field[..nul], &name_field[nul + 1..]),
        None => (name_field, &[][..]),
    };

    match decode_utf16le(std_name, enc_data) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => String::from_utf8_lossy(std_name).into_owned(),
    }
}
