use num_enum::IntoPrimitive;
use strum::{Display, EnumIter};

/// Status word bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, Display, EnumIter)]
#[repr(u16)]
pub enum Flag {
    /// Zero
    Z = 0x0001,
    /// Overflow
    O = 0x0002,
    /// Carry
    C = 0x0004,
    /// Negative
    N = 0x0008,
    /// Timer interrupt mask
    Tr = 0x2000,
    /// Terminal interrupt mask
    Tl = 0x4000,
    /// Global interrupt mask, set while servicing an interrupt
    I = 0x8000,
}

impl Flag {
    pub fn mask(self) -> u16 {
        self.into()
    }
}

/// `0b` style rendering, most significant bit first.
pub fn bits(psw: u16) -> String {
    format!("{:016b}", psw)
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn flag_masks_are_disjoint() {
        let all = Flag::iter().fold(0u16, |acc, f| {
            assert_eq!(acc & f.mask(), 0, "{f} overlaps");
            acc | f.mask()
        });
        assert_eq!(all, 0xE00F);
    }

    #[test]
    fn render_bits() {
        assert_eq!(bits(0x8001), "1000000000000001");
        assert_eq!(bits(0), "0000000000000000");
    }
}
