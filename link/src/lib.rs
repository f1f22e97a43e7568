pub mod error;
pub mod layout;
pub mod merge;
pub mod reloc;

pub use error::Error;
pub use merge::Linker;

use indexmap::IndexMap;
use objfile::{MemoryImage, ObjectModule};

/// Links `modules` into an absolute memory image. `places` fixes section start
/// addresses; names that match no section are ignored.
pub fn link_hex(modules: &[ObjectModule], places: &IndexMap<String, u16>) -> Result<MemoryImage, Error> {
    let mut linker = Linker::new();
    for module in modules {
        linker.add(module)?;
    }
    linker.check_resolved()?;
    linker.place(places)?;
    linker.relocate()
}

/// Merges `modules` into one relocatable object module.
pub fn link_relocatable(modules: &[ObjectModule]) -> Result<ObjectModule, Error> {
    let mut linker = Linker::new();
    for module in modules {
        linker.add(module)?;
    }
    Ok(linker.relocatable())
}
