use objfile::{MemoryImage, RelocKind};

use crate::error::Error;
use crate::merge::{add_word, Linker};

impl Linker {
    /// Moves labels to absolute addresses, patches every relocation and
    /// copies the sections into a memory image. Call after `place`.
    pub fn relocate(&mut self) -> Result<MemoryImage, Error> {
        for symbol in self.symbols.values_mut().filter(|s| !s.is_section) {
            let start = symbol
                .section
                .as_deref()
                .and_then(|name| self.sections.get(name))
                .map(|s| s.start)
                .unwrap_or(0);
            symbol.value = symbol.value.wrapping_add(start);
        }

        let mut image = MemoryImage::new();
        for section in self.sections.values() {
            let mut bytes = section.bytes.clone();
            for reloc in &section.relocs {
                let Some(symbol) = self.symbols.get(&reloc.symbol) else {
                    continue;
                };
                let mut addend = match symbol.is_section {
                    true => self.sections.get(&symbol.name).map(|s| s.start).unwrap_or(0),
                    false => symbol.value,
                };
                if reloc.kind == RelocKind::PcRel {
                    addend = addend.wrapping_sub(reloc.offset.wrapping_add(section.start));
                }
                add_word(&mut bytes, reloc.offset, addend);
            }
            image
                .place(section.start, &bytes)
                .map_err(|_| Error::AddressOutOfRange(section.name.clone(), section.start as u32, section.len()))?;
        }
        Ok(image)
    }
}
