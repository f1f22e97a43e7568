use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use arch::io::{IRQ_TERMINAL, TERM_IN, TERM_OUT};

use super::Hook;
use crate::error::Error;
use crate::exec::Step;
use crate::model::Cpu;

/// Memory mapped console: `term_out` is printed, input bytes land in
/// `term_in` and raise the terminal interrupt.
pub struct Terminal<W: Write> {
    out: W,
    input: Option<Receiver<u8>>,
    wrote: bool,
}

impl Terminal<std::io::Stdout> {
    /// Console on stdout, fed by a background reader on stdin.
    pub fn stdio() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for byte in std::io::stdin().lock().bytes() {
                let Ok(byte) = byte else {
                    break;
                };
                if tx.send(byte).is_err() {
                    break;
                }
            }
        });
        Self::new(std::io::stdout(), Some(rx))
    }
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W, input: Option<Receiver<u8>>) -> Self {
        Self {
            out,
            input,
            wrote: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Hook for Terminal<W> {
    fn init(&mut self, cpu: Cpu) -> Result<Cpu, Error> {
        println!(" * Terminal: out={:0>4X} in={:0>4X}", TERM_OUT, TERM_IN);
        Ok(cpu)
    }

    fn exec(&mut self, _time: u64, _step: &Step, mut cpu: Cpu) -> Result<Cpu, Error> {
        let out = cpu.get(TERM_OUT);
        if out != 0 {
            self.out.write_all(&[out as u8]).map_err(Error::Terminal)?;
            self.out.flush().map_err(Error::Terminal)?;
            cpu.set(TERM_OUT, 0);
            self.wrote = true;
        }
        if let Some(byte) = self.input.as_ref().and_then(|rx| rx.try_recv().ok()) {
            cpu.set(TERM_IN, byte as u16);
            cpu.request(IRQ_TERMINAL);
        }
        Ok(cpu)
    }

    fn fini(&mut self, cpu: Cpu) -> Result<Cpu, Error> {
        if self.wrote {
            self.out.write_all(b"\n").map_err(Error::Terminal)?;
        }
        Ok(cpu)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use arch::op::Opcode;

    const STEP: Step = Step {
        addr: 0,
        opcode: Opcode::STR,
    };

    #[test]
    fn prints_and_clears_output() {
        let mut term = Terminal::new(Vec::new(), None);
        let mut cpu = Cpu::new();
        cpu.set(TERM_OUT, b'h' as u16);
        let cpu = term.exec(0, &STEP, cpu).unwrap();
        assert_eq!(cpu.get(TERM_OUT), 0);
        let cpu = term.exec(1, &STEP, cpu).unwrap();
        term.fini(cpu).unwrap();
        assert_eq!(term.into_inner(), b"h\n");
    }

    #[test]
    fn silent_run_adds_no_newline() {
        let mut term = Terminal::new(Vec::new(), None);
        let cpu = term.exec(0, &STEP, Cpu::new()).unwrap();
        term.fini(cpu).unwrap();
        assert!(term.into_inner().is_empty());
    }

    #[test]
    fn input_raises_interrupt() {
        let (tx, rx) = mpsc::channel();
        let mut term = Terminal::new(Vec::new(), Some(rx));
        let cpu = term.exec(0, &STEP, Cpu::new()).unwrap();
        assert!(!cpu.pending(IRQ_TERMINAL));

        tx.send(b'x').unwrap();
        let cpu = term.exec(1, &STEP, cpu).unwrap();
        assert_eq!(cpu.get(TERM_IN), b'x' as u16);
        assert!(cpu.pending(IRQ_TERMINAL));
    }
}
