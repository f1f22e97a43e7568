use super::Hook;
use crate::error::Error;
use crate::exec::Step;
use crate::model::Cpu;

/// Prints every retired instruction.
pub struct Trace;

impl Hook for Trace {
    fn exec(&mut self, time: u64, step: &Step, cpu: Cpu) -> Result<Cpu, Error> {
        println!(
            "[{:0>4}] {:0>4X}: {:<5} -> pc={:0>4X} sp={:0>4X} psw={:0>4X}",
            time,
            step.addr,
            step.opcode.to_string(),
            cpu.pc(),
            cpu.sp(),
            cpu.psw()
        );
        Ok(cpu)
    }
}
