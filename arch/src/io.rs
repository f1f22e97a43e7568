//! Memory-mapped device cells and interrupt lines.

use std::time::Duration;

/// Terminal output cell. A non-zero word is printed and cleared.
pub const TERM_OUT: u16 = 0xFF00;
/// Terminal input cell, written on every received character.
pub const TERM_IN: u16 = 0xFF02;
/// Timer configuration cell, low three bits select the period.
pub const TIM_CFG: u16 = 0xFF10;

pub const IRQ_RESET: u8 = 0;
pub const IRQ_ERROR: u8 = 1;
pub const IRQ_TIMER: u8 = 2;
pub const IRQ_TERMINAL: u8 = 3;
pub const IRQ_LINES: u8 = 8;

/// Address of the interrupt vector entry for `line`.
pub fn vector(line: u8) -> u16 {
    (line % IRQ_LINES) as u16 * 2
}

const TIMER_PERIODS_MS: [u64; 8] = [500, 1000, 1500, 2000, 5000, 10_000, 30_000, 60_000];

pub fn timer_period(cfg: u16) -> Duration {
    Duration::from_millis(TIMER_PERIODS_MS[(cfg & 0x7) as usize])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vectors() {
        assert_eq!(vector(IRQ_TERMINAL), 6);
        assert_eq!(vector(IRQ_TIMER), 4);
        assert_eq!(vector(9), 2);
    }

    #[test]
    fn periods() {
        assert_eq!(timer_period(0), Duration::from_millis(500));
        assert_eq!(timer_period(7), Duration::from_secs(60));
        assert_eq!(timer_period(0x0F), Duration::from_secs(60));
    }
}
