pub mod error;
pub mod exec;
pub mod hooks;
pub mod model;

pub use error::Error;
pub use exec::Step;
pub use hooks::Hook;
pub use model::Cpu;

/// Runs `cpu` until it halts or `tmax` instructions have retired.
///
/// Hooks run in order after every instruction, then pending interrupts are
/// taken.
pub fn run(mut cpu: Cpu, hooks: &mut [Box<dyn Hook>], tmax: Option<u64>) -> Result<Cpu, Error> {
    cpu = hooks.iter_mut().try_fold(cpu, |cpu, hook| hook.init(cpu))?;

    for time in 0..tmax.unwrap_or(u64::MAX) {
        let step = cpu.step()?;
        if cpu.is_halted() {
            break;
        }
        cpu = hooks
            .iter_mut()
            .try_fold(cpu, |cpu, hook| hook.exec(time, &step, cpu))?;
        cpu.check_interrupts()?;
    }

    hooks.iter_mut().try_fold(cpu, |cpu, hook| hook.fini(cpu))
}
