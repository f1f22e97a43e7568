use arch::io::{vector, IRQ_ERROR, IRQ_LINES, IRQ_RESET};
use arch::psw::{bits, Flag};
use arch::reg::Reg;
use objfile::MemoryImage;

use crate::error::Error;

const MEMORY_SIZE: usize = 0x1_0000;
const REGS: usize = 8;
/// Descriptor index that addresses the status word.
const PSW_INDEX: u8 = 8;

/// Processor and memory state.
#[derive(Debug, Clone)]
pub struct Cpu {
    mem: Vec<u8>,
    r: [u16; REGS],
    psw: u16,
    /// Pending interrupt requests, one bit per line.
    irq: u8,
    /// End of the loaded image; the stack may not grow into it.
    top: u32,
    halted: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

// Memory access
impl Cpu {
    pub fn get8(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    pub fn set8(&mut self, addr: u16, val: u8) {
        self.mem[addr as usize] = val;
    }

    /// Little-endian word at `addr`.
    pub fn get(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.get8(addr), self.get8(addr.wrapping_add(1))])
    }

    pub fn set(&mut self, addr: u16, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.set8(addr, lo);
        self.set8(addr.wrapping_add(1), hi);
    }
}

// Registers
impl Cpu {
    pub fn reg(&self, reg: Reg) -> u16 {
        match reg {
            Reg::PSW => self.psw,
            reg => self.r[reg.index() as usize],
        }
    }

    pub fn set_reg(&mut self, reg: Reg, val: u16) {
        match reg {
            Reg::PSW => self.psw = val,
            reg => self.r[reg.index() as usize] = val,
        }
    }

    /// Register named by a descriptor nibble.
    pub(crate) fn operand(&self, index: u8) -> Result<u16, Error> {
        match index {
            i if (i as usize) < REGS => Ok(self.r[i as usize]),
            PSW_INDEX => Ok(self.psw),
            _ => Err(Error::IllegalInstruction("invalid register index")),
        }
    }

    pub(crate) fn set_operand(&mut self, index: u8, val: u16) -> Result<(), Error> {
        match index {
            i if (i as usize) < REGS => self.r[i as usize] = val,
            PSW_INDEX => self.psw = val,
            _ => return Err(Error::IllegalInstruction("invalid register index")),
        }
        Ok(())
    }

    pub(crate) fn step_operand(&mut self, index: u8, delta: i16) -> Result<(), Error> {
        if delta != 0 {
            let val = self.operand(index)?.wrapping_add_signed(delta);
            self.set_operand(index, val)?;
        }
        Ok(())
    }

    pub fn pc(&self) -> u16 {
        self.reg(Reg::PC)
    }

    pub fn sp(&self) -> u16 {
        self.reg(Reg::SP)
    }

    pub fn psw(&self) -> u16 {
        self.psw
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.psw & flag.mask() != 0
    }

    pub fn set_flag(&mut self, flag: Flag, on: bool) {
        match on {
            true => self.psw |= flag.mask(),
            false => self.psw &= !flag.mask(),
        }
    }
}

// Program counter and stack
impl Cpu {
    /// Advances pc by one byte; wrapping around is fatal.
    pub(crate) fn inc_pc(&mut self) -> Result<(), Error> {
        let pc = self.pc().wrapping_add(1);
        self.set_reg(Reg::PC, pc);
        match pc {
            0 => Err(Error::PcOutOfBounds),
            _ => Ok(()),
        }
    }

    /// Byte at pc, then advances pc.
    pub(crate) fn fetch(&mut self) -> Result<u8, Error> {
        let byte = self.get8(self.pc());
        self.inc_pc()?;
        Ok(byte)
    }

    pub(crate) fn fetch16(&mut self) -> Result<u16, Error> {
        let lo = self.fetch()?;
        let hi = self.fetch()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn push(&mut self, val: u16) -> Result<(), Error> {
        let sp = self.sp().wrapping_sub(2);
        self.set_reg(Reg::SP, sp);
        if sp as u32 <= self.top {
            return Err(Error::StackOverflow);
        }
        self.set(sp, val);
        Ok(())
    }

    pub fn pop(&mut self) -> u16 {
        let sp = self.sp();
        let val = self.get(sp);
        self.set_reg(Reg::SP, sp.wrapping_add(2));
        val
    }
}

// Interrupts
impl Cpu {
    /// Marks `line` as pending; it is taken at the next interrupt check.
    pub fn request(&mut self, line: u8) {
        self.irq |= 1 << (line % 8);
    }

    pub fn pending(&self, line: u8) -> bool {
        self.irq & 1 << (line % 8) != 0
    }

    fn masked(&self, line: u8) -> bool {
        if self.flag(Flag::I) {
            return true;
        }
        match line {
            2 => self.flag(Flag::Tr),
            3 => self.flag(Flag::Tl),
            _ => false,
        }
    }

    /// Enters the handler of the lowest eligible pending line, if any.
    pub fn check_interrupts(&mut self) -> Result<Option<u8>, Error> {
        let Some(line) = (IRQ_ERROR..IRQ_LINES).find(|&line| self.pending(line) && !self.masked(line)) else {
            return Ok(None);
        };
        self.push(self.pc())?;
        self.push(self.psw)?;
        self.set_flag(Flag::I, true);
        let handler = self.get(vector(line));
        self.set_reg(Reg::PC, handler);
        self.irq &= !(1 << line);
        Ok(Some(line))
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            mem: vec![0; MEMORY_SIZE],
            r: [0; REGS],
            psw: 0,
            irq: 0,
            top: 0,
            halted: false,
        }
    }

    /// Copies `image` into memory and starts at the reset vector.
    pub fn load(image: &MemoryImage) -> Self {
        let mut cpu = Self::new();
        for (addr, byte) in image.iter() {
            cpu.set8(addr, byte);
        }
        cpu.top = image.top();
        let reset = cpu.get(vector(IRQ_RESET));
        cpu.set_reg(Reg::PC, reset);
        cpu
    }

    pub fn top(&self) -> u32 {
        self.top
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }

    /// Final state summary printed after the run.
    pub fn report(&self) -> String {
        let mut out = String::new();
        out.push_str("------------------------------------------------\n");
        out.push_str("Emulated processor executed halt instruction\n");
        out.push_str(&format!("Emulated processor state: psw=0b{}\n", bits(self.psw)));
        for (i, regs) in self.r.chunks(4).enumerate() {
            let line = regs
                .iter()
                .enumerate()
                .map(|(j, v)| format!("r{}=0x{:04x}", i * 4 + j, v))
                .collect::<Vec<_>>()
                .join("    ");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}
