use color_print::cprintln;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown operation at line {0}: `{1}`")]
    UnknownOperation(usize, String),

    #[error("Syntax error at line number: {0}.")]
    SyntaxError(usize),

    #[error("Symbol defined at line {0} belongs to no section. Add a .section directive beforehand.")]
    NoSection(usize),

    #[error("Literal value at line {0} is too big.")]
    LiteralTooBig(usize),

    #[error("Section defined at line {0} has already been defined.")]
    SectionDefined(usize),

    #[error("Section at line {0} grows past the 16-bit address space.")]
    SectionTooLarge(usize),

    #[error("Symbol \"{0}\" already declared as extern.")]
    GlobalExternCollision(String),

    #[error("Symbol \"{0}\" already declared as global.")]
    ExternGlobalCollision(String),

    #[error("Symbol \"{0}\" is defined and cannot be imported using .extern.")]
    ImportingDefinedSymbol(String),

    #[error("Cannot define symbol \"{0}\" as it is declared as extern.")]
    DefiningExternSymbol(String),

    #[error("Re-defined label: `{0}`")]
    RedefinedLabel(String),

    #[error("Undefined label: `{0}`")]
    UndefinedLabel(String),

    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to create file: {0}")]
    FileCreate(String, #[source] std::io::Error),

    #[error("Failed to write file: {0}")]
    FileWrite(String, #[source] std::io::Error),
}

impl Error {
    /// Source line the error points at, when it carries one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::UnknownOperation(line, _)
            | Error::SyntaxError(line)
            | Error::NoSection(line)
            | Error::LiteralTooBig(line)
            | Error::SectionDefined(line)
            | Error::SectionTooLarge(line) => Some(*line),
            _ => None,
        }
    }

    /// Print error with diagnostic information showing file location and line content.
    /// `line` is 1-based; `None` prints the message only.
    pub fn print_diag(&self, file: &str, line: Option<usize>, source: &[String]) {
        cprintln!("<red,bold>error</>: {}", self);

        let Some(line_num) = line.filter(|n| *n > 0) else {
            return;
        };
        cprintln!("     <blue>--></> <underline>{}:{}</>", file, line_num);
        cprintln!("      <blue>|</>");

        let line_content = source.get(line_num - 1).map(|s| s.as_str()).unwrap_or("");

        cprintln!(" <blue>{:>4} |</> {}", line_num, line_content);
        cprintln!("      <blue>|</>");
    }
}
