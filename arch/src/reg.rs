use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Register operand. `PSW` is encodable in a descriptor nibble but is not a
/// general purpose register.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    Default,
    TryFromPrimitive,
    IntoPrimitive,
    EnumString,
    Display,
    Eq,
)]
#[repr(u8)]
pub enum Reg {
    #[default]
    #[strum(serialize = "r0")]
    R0,
    #[strum(serialize = "r1")]
    R1,
    #[strum(serialize = "r2")]
    R2,
    #[strum(serialize = "r3")]
    R3,
    #[strum(serialize = "r4")]
    R4,
    #[strum(serialize = "r5")]
    R5,
    #[strum(to_string = "sp", serialize = "r6")]
    SP,
    #[strum(to_string = "pc", serialize = "r7")]
    PC,
    #[strum(serialize = "psw")]
    PSW,
}

impl Reg {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.parse::<Self>() {
            Ok(a) => Ok(a),
            Err(_) => Err(format!("Unknown reg name: {s}")),
        }
    }

    /// Index used inside a register descriptor nibble.
    pub fn index(self) -> u8 {
        self.into()
    }
}

/// Value of an unused descriptor nibble.
pub const NO_REG: u8 = 0xF;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_names_and_aliases() {
        assert_eq!(Reg::parse("r0"), Ok(Reg::R0));
        assert_eq!(Reg::parse("r6"), Ok(Reg::SP));
        assert_eq!(Reg::parse("sp"), Ok(Reg::SP));
        assert_eq!(Reg::parse("pc"), Ok(Reg::PC));
        assert_eq!(Reg::parse("r7"), Ok(Reg::PC));
        assert_eq!(Reg::parse("psw"), Ok(Reg::PSW));
        assert!(Reg::parse("r8").is_err());
        assert!(Reg::parse("hoge").is_err());
    }

    #[test]
    fn index_and_display() {
        assert_eq!(Reg::SP.index(), 6);
        assert_eq!(Reg::PC.index(), 7);
        assert_eq!(Reg::PSW.index(), 8);
        assert_eq!(Reg::SP.to_string(), "sp");
        assert_eq!(Reg::R3.to_string(), "r3");
        assert_eq!(Reg::try_from(7u8).ok(), Some(Reg::PC));
        assert!(Reg::try_from(9u8).is_err());
    }
}
