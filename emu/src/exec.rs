use arch::mode::{AddrMode, RegDescr, UpdateMode};
use arch::op::Opcode;
use arch::psw::Flag;
use arch::reg::Reg;

use crate::error::Error;
use crate::model::Cpu;

/// One retired instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Address of the opcode byte.
    pub addr: u16,
    pub opcode: Opcode,
}

/// Decoded operand bytes of a jump or data instruction.
#[derive(Debug, Clone, Copy)]
struct Operand {
    descr: RegDescr,
    mode: AddrMode,
    update: UpdateMode,
    imm: u16,
}

const SP: u8 = 6;

impl Cpu {
    /// Executes the instruction at pc.
    pub fn step(&mut self) -> Result<Step, Error> {
        let addr = self.pc();
        let byte = self.fetch()?;
        let opcode = Opcode::try_from(byte).map_err(|_| Error::IllegalOpcode(byte, addr))?;

        match opcode {
            Opcode::HALT => self.halt(),
            Opcode::INT => {
                let descr = self.descr()?;
                let line = (self.operand(descr.dst)? % 8) as u8;
                self.push(self.pc())?;
                self.push(self.psw())?;
                let handler = self.get(arch::io::vector(line));
                self.set_reg(Reg::PC, handler);
            }
            Opcode::IRET => {
                let psw = self.pop();
                self.set_reg(Reg::PSW, psw);
                let pc = self.pop();
                self.set_reg(Reg::PC, pc);
            }
            Opcode::RET => {
                let pc = self.pop();
                self.set_reg(Reg::PC, pc);
            }
            Opcode::CALL => {
                let op = self.decode()?;
                self.push(self.pc())?;
                let target = self.target(&op)?;
                self.set_reg(Reg::PC, target);
            }
            Opcode::JMP => self.jump(true)?,
            Opcode::JEQ => self.jump(self.flag(Flag::Z))?,
            Opcode::JNE => self.jump(!self.flag(Flag::Z))?,
            Opcode::JGT => {
                let taken = !self.flag(Flag::Z) && self.flag(Flag::N) == self.flag(Flag::O);
                self.jump(taken)?
            }
            Opcode::XCHG => {
                let RegDescr { dst, src } = self.descr()?;
                let (d, s) = (self.operand(dst)?, self.operand(src)?);
                self.set_operand(dst, s)?;
                self.set_operand(src, d)?;
            }
            Opcode::ADD => self.alu(u16::wrapping_add)?,
            Opcode::SUB => self.alu(u16::wrapping_sub)?,
            Opcode::MUL => self.alu(u16::wrapping_mul)?,
            Opcode::DIV => {
                let RegDescr { dst, src } = self.descr()?;
                let (d, s) = (self.operand(dst)?, self.operand(src)?);
                if s == 0 {
                    return Err(Error::IllegalInstruction("division by zero"));
                }
                self.set_operand(dst, d / s)?;
            }
            Opcode::CMP => {
                let RegDescr { dst, src } = self.descr()?;
                let (d, s) = (self.operand(dst)?, self.operand(src)?);
                self.compare(d, s);
            }
            Opcode::NOT => {
                let RegDescr { dst, .. } = self.descr()?;
                let d = self.operand(dst)?;
                self.set_operand(dst, !d)?;
            }
            Opcode::AND => self.alu(|d, s| d & s)?,
            Opcode::OR => self.alu(|d, s| d | s)?,
            Opcode::XOR => self.alu(|d, s| d ^ s)?,
            Opcode::TEST => {
                let RegDescr { dst, src } = self.descr()?;
                let t = self.operand(dst)? & self.operand(src)?;
                self.set_flag(Flag::Z, t == 0);
                self.set_flag(Flag::N, t & 0x8000 != 0);
            }
            Opcode::SHL => self.shift(shl)?,
            Opcode::SHR => self.shift(shr)?,
            Opcode::LDR => self.load_op()?,
            Opcode::STR => self.store_op()?,
        }

        Ok(Step { addr, opcode })
    }

    fn descr(&mut self) -> Result<RegDescr, Error> {
        Ok(RegDescr::from_byte(self.fetch()?))
    }

    /// Reads descriptor, mode byte and payload.
    fn decode(&mut self) -> Result<Operand, Error> {
        let descr = self.descr()?;
        let (update, mode) = split_mode(self.fetch()?)?;
        let imm = match mode.payload_len() {
            0 => 0,
            _ => self.fetch16()?,
        };
        Ok(Operand {
            descr,
            mode,
            update,
            imm,
        })
    }

    /// Jump destination; applies the source register update.
    fn target(&mut self, op: &Operand) -> Result<u16, Error> {
        let src = op.descr.src;
        Ok(match op.mode {
            AddrMode::Immediate => op.imm,
            AddrMode::RegDirect => self.operand(src)?,
            AddrMode::RegIndirect => self.indirect(op, 0)?,
            AddrMode::RegIndirectOffset => self.indirect(op, op.imm)?,
            AddrMode::Memory => self.get(op.imm),
            AddrMode::RegDirectAddition => self.pc().wrapping_add(op.imm),
        })
    }

    /// Word at `r[src] + offset` with pre/post update of `r[src]`.
    fn indirect(&mut self, op: &Operand, offset: u16) -> Result<u16, Error> {
        let src = op.descr.src;
        self.step_operand(src, op.update.pre())?;
        let val = self.get(self.operand(src)?.wrapping_add(offset));
        self.step_operand(src, op.update.post())?;
        Ok(val)
    }

    fn jump(&mut self, taken: bool) -> Result<(), Error> {
        if !taken {
            // Skip the descriptor, mode byte and payload
            let (_, mode) = split_mode(self.get8(self.pc().wrapping_add(1)))?;
            for _ in 0..2 + mode.payload_len() {
                self.inc_pc()?;
            }
            return Ok(());
        }
        let op = self.decode()?;
        let target = self.target(&op)?;
        self.set_reg(Reg::PC, target);
        Ok(())
    }

    fn alu(&mut self, f: impl Fn(u16, u16) -> u16) -> Result<(), Error> {
        let RegDescr { dst, src } = self.descr()?;
        let val = f(self.operand(dst)?, self.operand(src)?);
        self.set_operand(dst, val)
    }

    fn compare(&mut self, d: u16, s: u16) {
        let (t, borrow) = d.overflowing_sub(s);
        let sign = |v: u16| v & 0x8000 != 0;
        self.set_flag(Flag::Z, t == 0);
        self.set_flag(Flag::N, sign(t));
        self.set_flag(Flag::C, borrow);
        self.set_flag(Flag::O, sign(d) != sign(s) && sign(t) != sign(d));
    }

    fn shift(&mut self, f: fn(u16, u16) -> (u16, bool)) -> Result<(), Error> {
        let RegDescr { dst, src } = self.descr()?;
        let (d, s) = (self.operand(dst)?, self.operand(src)?);
        if s & 0x8000 != 0 {
            return Err(Error::IllegalInstruction("negative shift operand"));
        }
        let (val, carry) = f(d, s);
        self.set_operand(dst, val)?;
        self.set_flag(Flag::Z, val == 0);
        self.set_flag(Flag::N, val & 0x8000 != 0);
        self.set_flag(Flag::C, carry);
        Ok(())
    }

    fn load_op(&mut self) -> Result<(), Error> {
        let op = self.decode()?;
        let RegDescr { dst, src } = op.descr;
        match op.mode {
            AddrMode::Immediate => self.set_operand(dst, op.imm),
            AddrMode::RegDirect => self.set_operand(dst, self.operand(src)?),
            AddrMode::RegIndirect if src == SP && op.update == UpdateMode::PostInc => {
                let val = self.pop();
                self.set_operand(dst, val)
            }
            AddrMode::RegIndirect | AddrMode::RegIndirectOffset => {
                let offset = match op.mode {
                    AddrMode::RegIndirectOffset => op.imm,
                    _ => 0,
                };
                self.step_operand(src, op.update.pre())?;
                let val = self.get(self.operand(src)?.wrapping_add(offset));
                self.set_operand(dst, val)?;
                self.step_operand(src, op.update.post())
            }
            AddrMode::Memory => self.set_operand(dst, self.get(op.imm)),
            AddrMode::RegDirectAddition => self.set_operand(dst, self.operand(src)?.wrapping_add(op.imm)),
        }
    }

    fn store_op(&mut self) -> Result<(), Error> {
        let op = self.decode()?;
        let RegDescr { dst, src } = op.descr;
        let val = self.operand(dst)?;
        match op.mode {
            AddrMode::Immediate => Err(Error::IllegalInstruction("str with immediate address mode")),
            AddrMode::RegDirect => self.set_operand(src, val),
            AddrMode::RegIndirect if src == SP && op.update == UpdateMode::PreDec => self.push(val),
            AddrMode::RegIndirect | AddrMode::RegIndirectOffset => {
                let offset = match op.mode {
                    AddrMode::RegIndirectOffset => op.imm,
                    _ => 0,
                };
                self.step_operand(src, op.update.pre())?;
                let addr = self.operand(src)?.wrapping_add(offset);
                self.set(addr, val);
                self.step_operand(src, op.update.post())
            }
            AddrMode::Memory => {
                self.set(op.imm, val);
                Ok(())
            }
            AddrMode::RegDirectAddition => self.set_operand(src, val.wrapping_add(op.imm)),
        }
    }
}

fn split_mode(byte: u8) -> Result<(UpdateMode, AddrMode), Error> {
    let (update, mode) = AddrMode::split(byte);
    let mode = AddrMode::try_from(mode).map_err(|_| Error::IllegalInstruction("unknown address mode"))?;
    let update = UpdateMode::try_from(update).map_err(|_| Error::IllegalInstruction("unknown update mode"))?;
    Ok((update, mode))
}

/// Result and carry: any bit shifted past bit 15.
fn shl(d: u16, s: u16) -> (u16, bool) {
    match s {
        0 => (d, false),
        1..=15 => (d << s, (d as u32) << s > 0xFFFF),
        _ => (0, d != 0),
    }
}

/// Result and carry: any shifted-out bit was 1.
fn shr(d: u16, s: u16) -> (u16, bool) {
    match s {
        0 => (d, false),
        1..=15 => (d >> s, d & ((1 << s) - 1) != 0),
        _ => (0, d != 0),
    }
}
