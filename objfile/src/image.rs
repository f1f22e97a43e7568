use std::collections::BTreeMap;
use std::fmt;

use crate::error::Error;

const ROW: u16 = 8;

/// Sparse absolute memory contents produced by the linker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    bytes: BTreeMap<u16, u8>,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `bytes` to consecutive addresses starting at `start`.
    pub fn place(&mut self, start: u16, bytes: &[u8]) -> Result<(), Error> {
        let end = start as u32 + bytes.len() as u32;
        if end > 0x1_0000 {
            return Err(Error::AddressOverflow(end - 1));
        }
        for (i, byte) in bytes.iter().enumerate() {
            self.bytes.insert(start + i as u16, *byte);
        }
        Ok(())
    }

    pub fn get(&self, addr: u16) -> Option<u8> {
        self.bytes.get(&addr).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, u8)> + '_ {
        self.bytes.iter().map(|(a, b)| (*a, *b))
    }

    /// End of the last populated 8-byte row.
    pub fn top(&self) -> u32 {
        self.bytes
            .keys()
            .next_back()
            .map(|last| (last & !(ROW - 1)) as u32 + ROW as u32)
            .unwrap_or(0)
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut image = Self::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let malformed = || Error::Malformed {
                what: "image line",
                line: idx + 1,
                text: raw.to_string(),
            };
            let (addr, data) = line.split_once(':').ok_or_else(malformed)?;
            let start = u16::from_str_radix(addr.trim(), 16).map_err(|_| malformed())?;
            let bytes = data
                .split_whitespace()
                .map(|b| u8::from_str_radix(b, 16).map_err(|_| malformed()))
                .collect::<Result<Vec<u8>, Error>>()?;
            image.place(start, &bytes)?;
        }
        Ok(image)
    }
}

/// Rows cover one aligned 8-byte block each, from its start up to the last
/// populated byte; holes inside a row are rendered as `00`.
impl fmt::Display for MemoryImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut row: Option<u16> = None;
        let mut next: u32 = 0;
        for (&addr, &byte) in &self.bytes {
            let base = addr & !(ROW - 1);
            if row != Some(base) {
                if row.is_some() {
                    writeln!(f)?;
                }
                write!(f, "{:04X}:", base)?;
                row = Some(base);
                next = base as u32;
            }
            while next < addr as u32 {
                write!(f, " 00")?;
                next += 1;
            }
            write!(f, " {:02X}", byte)?;
            next += 1;
        }
        if row.is_some() {
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rows_are_aligned_and_padded() {
        let mut image = MemoryImage::new();
        image.place(0x0003, &[0xAA, 0xBB]).unwrap();
        image.place(0x0006, &[0xCC, 0xDD, 0xEE]).unwrap();
        image.place(0x0020, &[0x11]).unwrap();
        assert_eq!(
            image.to_string(),
            "0000: 00 00 00 AA BB 00 CC DD\n0008: EE\n0020: 11\n"
        );
    }

    #[test]
    fn parse_back() {
        let text = "0000: 00 00 00 AA BB 00 CC DD\n0008: EE\n0020: 11\n";
        let image = MemoryImage::parse(text).unwrap();
        assert_eq!(image.get(0x0003), Some(0xAA));
        assert_eq!(image.get(0x0008), Some(0xEE));
        assert_eq!(image.get(0x0020), Some(0x11));
        assert_eq!(image.get(0x0021), None);
        assert_eq!(image.top(), 0x28);
    }

    #[test]
    fn rejects_overflow_and_garbage() {
        let mut image = MemoryImage::new();
        assert!(image.place(0xFFFF, &[1, 2]).is_err());
        assert!(MemoryImage::parse("00G0: 11").is_err());
        assert!(MemoryImage::parse("0000 11").is_err());
    }
}
