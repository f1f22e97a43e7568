use arch::mode::{AddrMode, RegDescr, UpdateMode};
use arch::op::OpKind;
use arch::reg::{Reg, NO_REG};
use objfile::RelocKind;

use crate::parser::{Args, Inst, Operand};

/// Placeholder emitted for a pc-relative operand before relocation.
pub const PC_REL_PLACEHOLDER: u16 = 0xFFFE;

/// Symbolic 16-bit placeholder inside an encoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixup {
    /// Byte position of the placeholder from the start of the instruction.
    pub at: u16,
    pub symbol: String,
    pub kind: RelocKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub fixup: Option<Fixup>,
}

impl Encoded {
    fn plain(bytes: Vec<u8>) -> Self {
        Self { bytes, fixup: None }
    }
}

impl Inst {
    pub fn encode(&self) -> Encoded {
        let op = u8::from(self.kind.opcode());
        match (&self.args, self.kind) {
            (Args::Reg(r), OpKind::PUSH) => Encoded::plain(vec![
                op,
                RegDescr::new(r.index(), Reg::SP.index()).to_byte(),
                AddrMode::RegIndirect.byte(UpdateMode::PreDec),
            ]),
            (Args::Reg(r), OpKind::POP) => Encoded::plain(vec![
                op,
                RegDescr::new(r.index(), Reg::SP.index()).to_byte(),
                AddrMode::RegIndirect.byte(UpdateMode::PostInc),
            ]),
            (Args::None, _) => Encoded::plain(vec![op]),
            (Args::Reg(r), _) => Encoded::plain(vec![op, RegDescr::dst_only(r.index()).to_byte()]),
            (Args::RegReg(d, s), _) => {
                Encoded::plain(vec![op, RegDescr::new(d.index(), s.index()).to_byte()])
            }
            (Args::Jump(operand), _) => encode_operand(op, NO_REG, operand, AddrMode::RegDirectAddition),
            (Args::Data(dst, operand), _) => {
                encode_operand(op, dst.index(), operand, AddrMode::RegIndirectOffset)
            }
        }
    }
}

/// `opcode, descriptor, mode[, payload]`. Jumps pass `NO_REG` as destination
/// and differ from data transfers only in the pc-relative mode.
fn encode_operand(op: u8, dst: u8, operand: &Operand, pc_rel: AddrMode) -> Encoded {
    let (src, mode, payload) = match operand {
        Operand::ImmLiteral(v) => (NO_REG, AddrMode::Immediate, Payload::Literal(*v)),
        Operand::ImmSymbol(s) => (NO_REG, AddrMode::Immediate, Payload::Symbol(s)),
        Operand::MemLiteral(v) => (NO_REG, AddrMode::Memory, Payload::Literal(*v)),
        Operand::MemSymbol(s) => (NO_REG, AddrMode::Memory, Payload::Symbol(s)),
        Operand::PcRel(s) => (Reg::PC.index(), pc_rel, Payload::PcRel(s)),
        Operand::RegDirect(r) => (r.index(), AddrMode::RegDirect, Payload::None),
        Operand::RegIndirect(r) => (r.index(), AddrMode::RegIndirect, Payload::None),
        Operand::RegOffsetLiteral(r, v) => {
            (r.index(), AddrMode::RegIndirectOffset, Payload::Literal(*v))
        }
        Operand::RegOffsetSymbol(r, s) => (r.index(), AddrMode::RegIndirectOffset, Payload::Symbol(s)),
    };

    let mut bytes = vec![
        op,
        RegDescr::new(dst, src).to_byte(),
        mode.byte(UpdateMode::None),
    ];
    let at = bytes.len() as u16;
    let fixup = match payload {
        Payload::None => None,
        Payload::Literal(v) => {
            bytes.extend_from_slice(&v.to_le_bytes());
            None
        }
        Payload::Symbol(s) => {
            bytes.extend_from_slice(&[0, 0]);
            Some(Fixup {
                at,
                symbol: s.to_string(),
                kind: RelocKind::SymbolWord,
            })
        }
        Payload::PcRel(s) => {
            bytes.extend_from_slice(&PC_REL_PLACEHOLDER.to_le_bytes());
            Some(Fixup {
                at,
                symbol: s.to_string(),
                kind: RelocKind::PcRel,
            })
        }
    };
    Encoded { bytes, fixup }
}

enum Payload<'a> {
    None,
    Literal(u16),
    Symbol(&'a str),
    PcRel(&'a str),
}
