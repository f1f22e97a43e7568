pub mod assembler;
pub mod encode;
pub mod error;
pub mod lexer;
pub mod parser;

pub use assembler::{assemble, Assembler, Flow};
pub use error::Error;
