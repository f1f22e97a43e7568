pub mod dump;
pub mod intr;
pub mod terminal;
pub mod timer;
pub mod trace;

use crate::error::Error;
use crate::exec::Step;
use crate::model::Cpu;

/// Side effect run around the instruction loop.
pub trait Hook {
    fn init(&mut self, cpu: Cpu) -> Result<Cpu, Error> {
        Ok(cpu)
    }
    /// Called after every retired instruction, before the interrupt check.
    fn exec(&mut self, time: u64, step: &Step, cpu: Cpu) -> Result<Cpu, Error>;
    fn fini(&mut self, cpu: Cpu) -> Result<Cpu, Error> {
        Ok(cpu)
    }
}
