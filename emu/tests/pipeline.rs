use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use arch::psw::Flag;
use arch::reg::Reg;
use indexmap::IndexMap;
use sxemu::hooks::{intr::Intr, terminal::Terminal};
use sxemu::{run, Cpu, Error, Hook};

/// Assembles and links `codes` with the `ivt` section at address 0.
fn boot(codes: &[&str]) -> Cpu {
    let modules = codes
        .iter()
        .map(|code| match sxasm::assemble(code) {
            Ok(module) => module,
            Err(e) => panic!("assembly failed: {e}\n{code}"),
        })
        .collect::<Vec<_>>();
    let places: IndexMap<String, u16> = [("ivt".to_string(), 0)].into_iter().collect();
    let image = sxlink::link_hex(&modules, &places).unwrap();
    println!("{}", image);
    Cpu::load(&image)
}

fn exec(codes: &[&str]) -> Result<Cpu, Error> {
    let mut hooks: Vec<Box<dyn Hook>> = vec![];
    run(boot(codes), &mut hooks, Some(100_000))
}

fn halted(codes: &[&str]) -> Cpu {
    let cpu = exec(codes).unwrap();
    assert!(cpu.is_halted());
    cpu
}

macro_rules! case {
    ($name:ident, $code:expr, $expects:pat) => {
        #[test]
        fn $name() {
            let result = exec(&[$code]);
            assert!(matches!(result, $expects), "{:?}", result.map(|cpu| cpu.report()));
        }
    };
}

case!(
    divide_by_zero,
    ".section ivt\n.word main\n.section text\nmain:\nldr r1, $4\nldr r2, $0\ndiv r1, r2\nhalt\n",
    Err(Error::IllegalInstruction("division by zero"))
);
case!(
    runaway_recursion,
    ".section ivt\n.word main\n.section text\nmain:\ncall main\n",
    Err(Error::StackOverflow)
);
case!(
    unknown_opcode,
    ".section ivt\n.word main\n.section text\nmain:\n.word 0xFFFF\n",
    Err(Error::IllegalOpcode(0xFF, _))
);
case!(
    store_immediate,
    ".section ivt\n.word main\n.section text\nmain:\nstr r1, $4\nhalt\n",
    Err(Error::IllegalInstruction(_))
);

#[test]
fn load_immediate() {
    let cpu = halted(&[".section ivt\n.word main\n.section text\nmain:\nldr r1, $5\nhalt\n"]);
    assert_eq!(cpu.reg(Reg::R1), 5);
    assert!(cpu.report().contains("r1=0x0005"));
}

#[test]
fn cross_module_load() {
    let cpu = halted(&[
        ".extern foo\n.section ivt\n.word main\n.section text\nmain: ldr r0, foo\nhalt\n",
        ".global foo\n.section data\nfoo: .word 42\n",
    ]);
    assert_eq!(cpu.reg(Reg::R0), 42);
}

#[test]
fn counting_loop() {
    let cpu = halted(&["\
.section ivt
.word main
.section text
main:
    ldr r0, $0
    ldr r1, $5
    ldr r2, $1
    ldr r3, $0
loop:
    add r0, r1
    sub r1, r2
    cmp r1, r3
    jgt loop
    jmp done
    ldr r0, $0xDEAD
done:
    halt
"]);
    assert_eq!(cpu.reg(Reg::R0), 15);
    assert_eq!(cpu.reg(Reg::R1), 0);
    assert!(cpu.flag(Flag::Z));
}

#[test]
fn pc_relative_operands() {
    let cpu = halted(&["\
.section ivt
.word main
.section text
main:
    ldr r1, %value
    jmp %skip
    ldr r1, $0
skip:
    halt
.section data
value: .word 9
"]);
    assert_eq!(cpu.reg(Reg::R1), 9);
}

#[test]
fn compare_sets_flags() {
    let cpu = halted(&[
        ".section ivt\n.word main\n.section text\nmain:\nldr r0, $0x7FFF\nldr r1, $0xFFFF\ncmp r0, r1\nhalt\n",
    ]);
    assert_eq!(cpu.psw() & 0xF, 0b1110);
}

#[test]
fn shift_right_carry() {
    let cpu = halted(&[
        ".section ivt\n.word main\n.section text\nmain:\nldr r0, $0x10\nldr r1, $4\nshr r0, r1\nhalt\n",
    ]);
    assert_eq!(cpu.reg(Reg::R0), 1);
    assert!(!cpu.flag(Flag::C));

    let cpu = halted(&[
        ".section ivt\n.word main\n.section text\nmain:\nldr r0, $0x10\nldr r1, $5\nshr r0, r1\nhalt\n",
    ]);
    assert_eq!(cpu.reg(Reg::R0), 0);
    assert!(cpu.flag(Flag::C));
    assert!(cpu.flag(Flag::Z));
}

#[test]
fn stack_and_subroutine() {
    let cpu = halted(&["\
.section ivt
.word main
.section text
main:
    ldr r1, $3
    push r1
    call double
    pop r2
    halt
double:
    add r1, r1
    ret
"]);
    assert_eq!(cpu.reg(Reg::R1), 6);
    assert_eq!(cpu.reg(Reg::R2), 3);
    assert_eq!(cpu.sp(), 0);
}

#[test]
fn software_interrupt() {
    let cpu = halted(&["\
.section ivt
.word main, 0, 0, handler
.section text
main:
    ldr r0, $3
    int r0
    ldr r2, $2
    halt
handler:
    ldr r1, $7
    ldr r3, sp
    iret
"]);
    assert_eq!(cpu.reg(Reg::R1), 7);
    assert_eq!(cpu.reg(Reg::R2), 2);
    // pc pushed first, then psw
    assert_eq!(cpu.reg(Reg::R3), 0xFFFC);
    assert_eq!(cpu.sp(), 0);
}

#[test]
fn untaken_jumps_skip_their_payload() {
    let cpu = halted(&["\
.section ivt
.word main
.section text
main:
    ldr r0, $1
    ldr r1, $1
    cmp r0, r1
    jne skip
    jne *cell
    jne *[r2 + 4]
    jne %skip
    ldr r3, $7
skip:
    halt
.section data
cell: .word skip
"]);
    assert_eq!(cpu.reg(Reg::R3), 7);
}

#[test]
fn iret_restores_flags() {
    let cpu = halted(&["\
.section ivt
.word main, 0, 0, handler
.section text
main:
    ldr psw, $0x000D
    ldr r0, $3
    int r0
    jeq done
    ldr r5, $1
done:
    halt
handler:
    ldr r1, $1
    ldr r2, $2
    cmp r2, r1
    ldr r4, psw
    iret
"]);
    // Handler saw Z, N and C cleared
    assert_eq!(cpu.reg(Reg::R4) & 0xF, 0);
    assert_eq!(cpu.psw() & 0xF, 0xD);
    assert_eq!(cpu.reg(Reg::R5), 0);
}

#[test]
fn external_interrupt_masks_and_returns() {
    let mut hooks: Vec<Box<dyn Hook>> = vec![Box::new(Intr::from_list([(0, 3), (1, 3)]))];
    let cpu = boot(&["\
.section ivt
.word main, 0, 0, handler
.section text
main:
    ldr r0, $1
    ldr r1, $1
    add r0, r1
    halt
handler:
    ldr r4, psw
    ldr r3, $1
    add r5, r3
    iret
"]);
    let cpu = run(cpu, &mut hooks, Some(1000)).unwrap();
    assert!(cpu.is_halted());
    // The handler saw I set, the second request waited for iret
    assert_eq!(cpu.reg(Reg::R4) & Flag::I.mask(), Flag::I.mask());
    assert_eq!(cpu.reg(Reg::R5), 2);
    assert!(!cpu.flag(Flag::I));
    assert_eq!(cpu.reg(Reg::R0), 2);
}

#[derive(Clone, Default)]
struct Shared(Rc<RefCell<Vec<u8>>>);

impl Write for Shared {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn terminal_output() {
    let out = Shared::default();
    let mut hooks: Vec<Box<dyn Hook>> = vec![Box::new(Terminal::new(out.clone(), None))];
    let cpu = boot(&["\
.section ivt
.word main
.section text
main:
    ldr r0, $0x68
    str r0, 0xFF00
    ldr r0, $0x69
    str r0, 0xFF00
    halt
"]);
    let cpu = run(cpu, &mut hooks, None).unwrap();
    assert!(cpu.is_halted());
    assert_eq!(cpu.get(0xFF00), 0);
    assert_eq!(out.0.borrow().as_slice(), b"hi\n");
}

#[test]
fn step_limit() {
    let mut hooks: Vec<Box<dyn Hook>> = vec![];
    let cpu = boot(&[".section ivt\n.word main\n.section text\nmain: jmp main\n"]);
    let cpu = run(cpu, &mut hooks, Some(10)).unwrap();
    assert!(!cpu.is_halted());
}
