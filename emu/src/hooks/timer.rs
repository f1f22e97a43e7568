use std::time::Instant;

use arch::io::{timer_period, IRQ_TIMER, TIM_CFG};

use super::Hook;
use crate::error::Error;
use crate::exec::Step;
use crate::model::Cpu;

/// Wall-clock interval timer raising the timer interrupt.
pub struct Timer {
    last: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self { last: Instant::now() }
    }

    /// Whether a period selected by `cfg` has elapsed since the last tick.
    pub fn due(&mut self, now: Instant, cfg: u16) -> bool {
        if now.saturating_duration_since(self.last) < timer_period(cfg) {
            return false;
        }
        self.last = now;
        true
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Hook for Timer {
    fn init(&mut self, cpu: Cpu) -> Result<Cpu, Error> {
        println!(" * Timer: cfg={:0>4X}", TIM_CFG);
        self.last = Instant::now();
        Ok(cpu)
    }

    fn exec(&mut self, _time: u64, _step: &Step, mut cpu: Cpu) -> Result<Cpu, Error> {
        if self.due(Instant::now(), cpu.get(TIM_CFG)) {
            cpu.request(IRQ_TIMER);
        }
        Ok(cpu)
    }
}
