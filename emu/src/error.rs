use color_print::cprintln;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Program counter has gotten out of bounds!")]
    PcOutOfBounds,

    #[error("Program has stopped because stack overflow was about to happen.")]
    StackOverflow,

    #[error("Emulator has detected an unknown operation code 0x{0:02X} at 0x{1:04X}. Emulation stopped.")]
    IllegalOpcode(u8, u16),

    #[error("Illegal instruction was about to be executed. Reason: \"{0}\".")]
    IllegalInstruction(&'static str),

    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to parse memory image: {0}")]
    Parse(String, #[source] objfile::Error),

    #[error("Failed to parse config: {0}")]
    Config(String, #[source] serde_yaml::Error),

    #[error("Failed to write terminal output")]
    Terminal(#[source] std::io::Error),
}

impl Error {
    pub fn print_diag(&self) {
        cprintln!("<red,bold>error</>: {}", self);
        let cause = match self {
            Error::Parse(_, e) => Some(e.to_string()),
            Error::Config(_, e) => Some(e.to_string()),
            Error::FileOpen(_, e) | Error::Terminal(e) => Some(e.to_string()),
            _ => None,
        };
        if let Some(cause) = cause {
            cprintln!("     <blue>= caused by:</> {}", cause);
        }
    }
}
