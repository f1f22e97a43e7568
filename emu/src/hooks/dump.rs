use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use arch::psw::bits;
use arch::reg::Reg;
use serde::{Deserialize, Serialize};

use super::Hook;
use crate::error::Error;
use crate::exec::Step;
use crate::model::Cpu;

/// Stack words shown below the top of memory.
const STACK_DEPTH: u32 = 8;

#[derive(Debug)]
pub struct Dump {
    file: Option<String>,
    all: bool,
    list: List,
}

/// Instruction address -> what to show once it retires.
#[derive(Debug, Default, Serialize, Deserialize)]
struct List(HashMap<u16, Config>);

#[derive(Debug, Default, Serialize, Deserialize)]
struct Config {
    #[serde(default)]
    stack: bool,
    #[serde(default)]
    mem: Vec<u16>,
}

impl Dump {
    pub fn arg(file: Option<String>, all: bool) -> Result<Self, Error> {
        let list = match &file {
            Some(fname) => {
                let f = File::open(fname).map_err(|e| Error::FileOpen(fname.clone(), e))?;
                serde_yaml::from_reader(BufReader::new(f)).map_err(|e| Error::Config(fname.clone(), e))?
            }
            None => List::default(),
        };
        Ok(Self { file, all, list })
    }

    fn get(&self, addr: u16) -> Option<&Config> {
        self.list.0.get(&addr)
    }
}

impl Hook for Dump {
    fn init(&mut self, cpu: Cpu) -> Result<Cpu, Error> {
        if self.all {
            println!(" * Dump all");
        }
        if let Some(fname) = &self.file {
            println!(" * Dump[{}] {:?}", self.list.0.len(), fname);
        }
        Ok(cpu)
    }

    fn exec(&mut self, time: u64, step: &Step, cpu: Cpu) -> Result<Cpu, Error> {
        if let Some(cfg) = self.get(step.addr) {
            println!("[{:0>4}] {:0>4X}: {}", time, step.addr, step.opcode);
            print_reg(&cpu);
            if cfg.stack {
                print_stack(&cpu);
            }
            print_mem(&cpu, &cfg.mem);
        } else if self.all {
            print_reg(&cpu);
        }
        Ok(cpu)
    }
}

fn print_reg(cpu: &Cpu) {
    let r = |reg| cpu.reg(reg);
    println!(" +----------+----------+----------+----------+");
    println!(
        " | r0: {:0>4X} | r1: {:0>4X} | r2: {:0>4X} | r3: {:0>4X} |",
        r(Reg::R0),
        r(Reg::R1),
        r(Reg::R2),
        r(Reg::R3)
    );
    println!(
        " | r4: {:0>4X} | r5: {:0>4X} | sp: {:0>4X} | pc: {:0>4X} |",
        r(Reg::R4),
        r(Reg::R5),
        r(Reg::SP),
        r(Reg::PC)
    );
    println!(" | psw: {:<37} |", bits(cpu.psw()));
    println!(" +----------+----------+----------+----------+");
}

fn print_stack(cpu: &Cpu) {
    let sp = cpu.sp() as u32;
    // An empty stack sits at 0
    let end = match sp {
        0 => 0,
        sp => (sp + 2 * STACK_DEPTH).min(0x1_0000),
    };
    for addr in (sp..end).step_by(2) {
        println!(" | {:0>4X} : {:0>4X}                                |", addr, cpu.get(addr as u16));
    }
    println!(" +-------------------------------------------+");
}

fn print_mem(cpu: &Cpu, addrs: &[u16]) {
    for addr in addrs {
        println!(" | {:0>4X} : {:0>4X}                                |", addr, cpu.get(*addr));
    }
    println!(" +-------------------------------------------+");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_format() {
        let list: List = serde_yaml::from_str("0x10: { stack: true, mem: [0x100, 0x102] }\n32: {}\n").unwrap();
        assert!(list.0[&0x10].stack);
        assert_eq!(list.0[&0x10].mem, vec![0x100, 0x102]);
        assert!(!list.0[&32].stack);
        assert!(list.0[&32].mem.is_empty());
    }
}
