use std::io::Write;
use std::path::Path;

use color_print::{cformat, cprintln};
use sxasm::{Assembler, Error, Flow};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input file
    input: String,

    /// Output file, defaults to the input with a `.o` extension
    #[clap(short, long)]
    output: Option<String>,

    /// Dump assembled bytes next to each source line
    #[clap(short, long)]
    dump: bool,
}

fn main() {
    use clap::Parser;

    let args: Args = Args::parse();
    let output = args.output.clone().unwrap_or_else(|| {
        Path::new(&args.input)
            .with_extension("o")
            .to_string_lossy()
            .into_owned()
    });
    println!("sx16 Assembler");

    println!("1. Read File and Parse Lines");
    println!("  < {}", args.input);
    let source: Vec<String> = match std::fs::read_to_string(&args.input) {
        Ok(text) => text.lines().map(str::to_string).collect(),
        Err(e) => fail(Error::FileOpen(args.input.clone(), e), &args.input, None, &[]),
    };

    let mut asm = Assembler::new();
    for code in &source {
        match asm.line(code) {
            Ok(Flow::Continue) => {}
            Ok(Flow::End) => break,
            Err(e) => {
                let line = e.line().or(Some(asm.current_line()));
                fail(e, &args.input, line, &source)
            }
        }
    }

    if args.dump {
        dump(&asm, &source);
    }

    println!("2. Resolve Symbols & Write Object Module");
    let module = match asm.finish() {
        Ok(module) => module,
        Err(e) => fail(e, &args.input, None, &source),
    };

    println!("  > {}", output);
    let written = std::fs::File::create(&output)
        .map_err(|e| Error::FileCreate(output.clone(), e))
        .and_then(|mut file| {
            write!(file, "{}", module).map_err(|e| Error::FileWrite(output.clone(), e))
        });
    if let Err(e) = written {
        fail(e, &args.input, None, &source);
    }
}

fn fail(e: Error, file: &str, line: Option<usize>, source: &[String]) -> ! {
    e.print_diag(file, line, source);
    std::process::exit(1);
}

fn dump(asm: &Assembler, source: &[String]) {
    println!("------+---------------+--------------------------+----------------------------");
    for emitted in asm.listing() {
        let code = source.get(emitted.line - 1).map(|s| s.trim()).unwrap_or("");
        let bytes = emitted
            .bytes
            .iter()
            .take(8)
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let more = if emitted.bytes.len() > 8 { cformat!("<dim>..</>") } else { String::new() };
        cprintln!(
            "<dim>{:>5}</> | <blue>{:>8}</>+{:04X} | <green>{:<24}</>{} | {}",
            emitted.line,
            asm.section_name(emitted.section),
            emitted.offset,
            bytes,
            more,
            code
        );
    }
    println!("------+---------------+--------------------------+----------------------------");
}
