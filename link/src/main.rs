use std::io::Write;

use color_print::cprintln;
use indexmap::IndexMap;
use objfile::ObjectModule;
use sxlink::layout::{load_places, parse_place};
use sxlink::{Error, Linker};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about, help_template = HELP_TEMPLATE)]
#[clap(group(clap::ArgGroup::new("mode").required(true).args(["hex", "relocatable"])))]
struct Args {
    /// Object modules, linked in the given order
    #[clap(required = true)]
    input: Vec<String>,

    /// Emit an absolute memory image
    #[clap(long)]
    hex: bool,

    /// Emit one merged relocatable object module
    #[clap(long)]
    relocatable: bool,

    /// Output file
    #[clap(short, long, default_value = "a.hex")]
    output: String,

    /// Fix a section start address, `<section>@<address>`
    #[clap(long)]
    place: Vec<String>,

    /// YAML file of `section: address` placements
    #[clap(long)]
    place_cfg: Option<String>,
}

/// Accepts the single-dash long options `-hex`, `-relocatable` and `-place=`.
fn normalize(args: impl Iterator<Item = String>) -> Vec<String> {
    args.map(|arg| match arg.as_str() {
        "-hex" | "-relocatable" => format!("-{arg}"),
        _ if arg.starts_with("-place=") => format!("-{arg}"),
        _ => arg,
    })
    .collect()
}

fn main() {
    use clap::Parser;

    let args = Args::parse_from(normalize(std::env::args()));
    println!("sx16 Linker");

    if let Err(e) = run(&args) {
        e.print_diag();
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Error> {
    println!("1. Read Object Modules");
    let mut modules = vec![];
    for path in &args.input {
        println!("  < {}", path);
        let text = std::fs::read_to_string(path).map_err(|e| Error::FileOpen(path.clone(), e))?;
        modules.push(ObjectModule::parse(&text).map_err(|e| Error::Parse(path.clone(), e))?);
    }

    println!("2. Merge Symbols & Sections");
    let mut linker = Linker::new();
    for module in &modules {
        linker.add(module)?;
    }

    let output = if args.relocatable {
        if !args.place.is_empty() || args.place_cfg.is_some() {
            cprintln!("<yellow,bold>warning</>: placement is ignored for relocatable output");
        }
        linker.relocatable().to_string()
    } else {
        linker.check_resolved()?;

        println!("3. Place Sections");
        let mut places: IndexMap<String, u16> = match &args.place_cfg {
            Some(path) => {
                println!("  < {}", path);
                load_places(path)?
            }
            None => IndexMap::new(),
        };
        for arg in &args.place {
            let (name, addr) = parse_place(arg)?;
            places.insert(name, addr);
        }
        for name in linker.place(&places)? {
            cprintln!("<yellow,bold>warning</>: no section named `{}` to place", name);
        }
        for section in linker.sections() {
            let how = if section.placed { "placed" } else { "packed" };
            println!(
                "  {:<16} {:04X}..{:04X} {}",
                section.name,
                section.start,
                section.start as u32 + section.len(),
                how
            );
        }

        println!("4. Relocate");
        linker.relocate()?.to_string()
    };

    println!("  > {}", args.output);
    let mut file = std::fs::File::create(&args.output).map_err(|e| Error::FileCreate(args.output.clone(), e))?;
    file.write_all(output.as_bytes())
        .map_err(|e| Error::FileWrite(args.output.clone(), e))
}
