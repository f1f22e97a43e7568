use color_print::cprintln;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Symbol \"{0}\" is defined multiple times.")]
    MultipleDefinition(String),

    #[error("Symbol \"{0}\" is defined both as a section and a label.")]
    LabelSectionCollision(String),

    #[error("Symbol \"{0}\" cannot be resolved.")]
    UnresolvedSymbol(String),

    #[error("Sections \"{0}\" and \"{1}\" are overlapping due to improper use of -place option.")]
    OverlappingSections(String, String),

    #[error("Section \"{0}\" does not fit below 0x10000 (start 0x{1:04X}, size {2}).")]
    AddressOutOfRange(String, u32, u32),

    #[error("Invalid -place option: `{0}`, expected <section>@<address>")]
    InvalidPlace(String),

    #[error("Failed to parse object module: {0}")]
    Parse(String, #[source] objfile::Error),

    #[error("Failed to parse config: {0}")]
    Config(String, #[source] serde_yaml::Error),

    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to create file: {0}")]
    FileCreate(String, #[source] std::io::Error),

    #[error("Failed to write file: {0}")]
    FileWrite(String, #[source] std::io::Error),
}

impl Error {
    pub fn print_diag(&self) {
        cprintln!("<red,bold>error</>: {}", self);
        let cause = match self {
            Error::Parse(_, e) => Some(e.to_string()),
            Error::Config(_, e) => Some(e.to_string()),
            Error::FileOpen(_, e) | Error::FileCreate(_, e) | Error::FileWrite(_, e) => Some(e.to_string()),
            _ => None,
        };
        if let Some(cause) = cause {
            cprintln!("     <blue>= caused by:</> {}", cause);
        }
    }
}
