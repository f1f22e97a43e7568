use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::Display;

use crate::reg::NO_REG;

/// Low nibble of the address-mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Display)]
#[repr(u8)]
pub enum AddrMode {
    Immediate = 0,
    RegDirect = 1,
    RegIndirect = 2,
    RegIndirectOffset = 3,
    Memory = 4,
    RegDirectAddition = 5,
}

/// High nibble of the address-mode byte: pointer update around the access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, TryFromPrimitive, IntoPrimitive, Display)]
#[repr(u8)]
pub enum UpdateMode {
    #[default]
    None = 0,
    PreDec = 1,
    PreInc = 2,
    PostDec = 3,
    PostInc = 4,
}

impl AddrMode {
    /// Bytes of payload following the mode byte.
    pub fn payload_len(self) -> u16 {
        match self {
            AddrMode::RegDirect | AddrMode::RegIndirect => 0,
            AddrMode::Immediate
            | AddrMode::RegIndirectOffset
            | AddrMode::Memory
            | AddrMode::RegDirectAddition => 2,
        }
    }

    pub fn byte(self, update: UpdateMode) -> u8 {
        u8::from(update) << 4 | u8::from(self)
    }

    /// Splits a mode byte into its update and address halves.
    pub fn split(byte: u8) -> (u8, u8) {
        (byte >> 4, byte & 0xF)
    }
}

impl UpdateMode {
    /// Register step applied before the access.
    pub fn pre(self) -> i16 {
        match self {
            UpdateMode::PreDec => -2,
            UpdateMode::PreInc => 2,
            UpdateMode::None | UpdateMode::PostDec | UpdateMode::PostInc => 0,
        }
    }

    /// Register step applied after the access.
    pub fn post(self) -> i16 {
        match self {
            UpdateMode::PostDec => -2,
            UpdateMode::PostInc => 2,
            UpdateMode::None | UpdateMode::PreDec | UpdateMode::PreInc => 0,
        }
    }
}

/// Register descriptor byte: destination in the high nibble, source in the low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegDescr {
    pub dst: u8,
    pub src: u8,
}

impl RegDescr {
    pub fn new(dst: u8, src: u8) -> Self {
        Self { dst, src }
    }

    pub fn dst_only(dst: u8) -> Self {
        Self { dst, src: NO_REG }
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            dst: byte >> 4,
            src: byte & 0xF,
        }
    }

    pub fn to_byte(self) -> u8 {
        (self.dst & 0xF) << 4 | (self.src & 0xF)
    }
}
