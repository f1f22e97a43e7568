pub mod error;
pub mod image;
pub mod module;
pub mod reloc;
pub mod symbol;

pub use error::Error;
pub use image::MemoryImage;
pub use module::{ObjectModule, SectionData};
pub use reloc::{Reloc, RelocKind};
pub use symbol::{PendingUse, Symbol, SymbolId, SymbolTable, UND};
