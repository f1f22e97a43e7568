use sxemu::hooks::{dump::Dump, intr::Intr, terminal::Terminal, timer::Timer, trace::Trace};
use sxemu::{Cpu, Error, Hook};

use objfile::MemoryImage;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Memory image produced by `sxlink --hex`
    input_file: String,

    /// Stop after this many instructions
    #[arg(short = 't', long)]
    tmax: Option<u64>,

    /// Print every retired instruction
    #[arg(long)]
    trace: bool,

    /// YAML file of `address: { stack, mem }` dump points
    #[arg(short, long)]
    dump_cfg: Option<String>,

    /// Dump registers after every instruction
    #[arg(short = 'a', long)]
    dump_all: bool,

    /// YAML file of `step: line` interrupt requests
    #[arg(short, long)]
    intr_cfg: Option<String>,

    /// Disable the interval timer
    #[arg(long)]
    no_timer: bool,
}

fn main() {
    use clap::Parser;

    let args = Args::parse();
    println!("sx16 Emulator");

    if let Err(e) = run(args) {
        println!();
        e.print_diag();
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    println!("+-----------------------------------------------+");
    println!("| {:<45} |", args.input_file);
    println!("+-----------------------------------------------+");

    let text = std::fs::read_to_string(&args.input_file).map_err(|e| Error::FileOpen(args.input_file.clone(), e))?;
    let image = MemoryImage::parse(&text).map_err(|e| Error::Parse(args.input_file.clone(), e))?;
    let cpu = Cpu::load(&image);

    println!("[INIT]");
    let mut hooks: Vec<Box<dyn Hook>> = vec![Box::new(Terminal::stdio())];
    if !args.no_timer {
        hooks.push(Box::new(Timer::new()));
    }
    hooks.push(Box::new(Intr::arg(args.intr_cfg)?));
    hooks.push(Box::new(Dump::arg(args.dump_cfg, args.dump_all)?));
    if args.trace {
        hooks.push(Box::new(Trace));
    }
    println!("[RUN]");

    let cpu = sxemu::run(cpu, &mut hooks, args.tmax)?;
    if cpu.is_halted() {
        print!("{}", cpu.report());
    } else {
        println!("------------------------------------------------");
        println!("Emulation stopped after {} steps", args.tmax.unwrap_or(u64::MAX));
    }
    Ok(())
}
