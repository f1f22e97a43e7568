use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed {what} at line {line}: `{text}`")]
    Malformed {
        what: &'static str,
        line: usize,
        text: String,
    },

    #[error("Expected `{expected}` at line {line}, found `{found}`")]
    Expected {
        expected: &'static str,
        line: usize,
        found: String,
    },

    #[error("Unexpected end of input, expected {0}")]
    UnexpectedEof(&'static str),

    #[error("Address 0x{0:X} is outside the 16-bit address space")]
    AddressOverflow(u32),
}
