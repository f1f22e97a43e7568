use std::collections::HashMap;

use indexmap::IndexMap;
use objfile::{ObjectModule, Reloc, SectionData, Symbol};

use crate::error::Error;

/// A symbol visible across modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSymbol {
    pub name: String,
    /// Offset inside the owning section, absolute after `relocate`.
    pub value: u16,
    /// Owning section; a section symbol names itself.
    pub section: Option<String>,
    pub global: bool,
    pub external: bool,
    pub is_section: bool,
    /// Index of the module that defined the symbol.
    pub origin: usize,
}

impl LinkSymbol {
    fn is_only_extern(&self) -> bool {
        self.external && !self.global
    }

    fn is_only_global(&self) -> bool {
        self.global && !self.external
    }
}

/// Same-named fragments of every module, concatenated in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub bytes: Vec<u8>,
    pub relocs: Vec<Reloc>,
    pub start: u16,
    pub placed: bool,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bytes: vec![],
            relocs: vec![],
            start: 0,
            placed: false,
        }
    }

    pub fn len(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Linker {
    pub(crate) symbols: IndexMap<String, LinkSymbol>,
    pub(crate) sections: IndexMap<String, Section>,
    modules: usize,
}

impl Linker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(&self, name: &str) -> Option<&LinkSymbol> {
        self.symbols.get(name)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    /// Merges the exported symbols of `module`, then appends its sections.
    pub fn add(&mut self, module: &ObjectModule) -> Result<(), Error> {
        let origin = self.modules;
        self.modules += 1;

        for symbol in module.symbols.iter() {
            if symbol.is_local() {
                continue;
            }
            let incoming = LinkSymbol {
                name: symbol.name.clone(),
                value: symbol.value,
                section: owning_section(module, symbol),
                global: symbol.global,
                external: symbol.external,
                is_section: symbol.is_section(),
                origin,
            };
            self.merge_symbol(incoming)?;
        }

        // Every section name is unique inside one module, so each fragment
        // starts where the merged section currently ends.
        let bases: HashMap<&str, u16> = module
            .sections
            .iter()
            .map(|s| {
                let base = self.sections.get(&s.name).map(|m| m.bytes.len()).unwrap_or(0);
                (s.name.as_str(), base as u16)
            })
            .collect();

        for fragment in &module.sections {
            self.append(module, fragment, &bases, origin);
        }
        Ok(())
    }

    fn merge_symbol(&mut self, incoming: LinkSymbol) -> Result<(), Error> {
        let Some(known) = self.symbols.get_mut(&incoming.name) else {
            self.symbols.insert(incoming.name.clone(), incoming);
            return Ok(());
        };
        if known.is_section != incoming.is_section {
            return Err(Error::LabelSectionCollision(incoming.name));
        }
        if known.is_only_extern() && incoming.is_only_global() {
            known.external = false;
            known.global = true;
            known.value = incoming.value;
            known.section = incoming.section;
            known.origin = incoming.origin;
        } else if known.is_only_global() && incoming.is_only_global() {
            return Err(Error::MultipleDefinition(incoming.name));
        }
        Ok(())
    }

    fn append(
        &mut self,
        module: &ObjectModule,
        fragment: &SectionData,
        bases: &HashMap<&str, u16>,
        origin: usize,
    ) {
        let base = bases.get(fragment.name.as_str()).copied().unwrap_or(0);

        for symbol in self.symbols.values_mut() {
            if !symbol.is_section && symbol.origin == origin && symbol.section.as_deref() == Some(&fragment.name) {
                symbol.value = symbol.value.wrapping_add(base);
            }
        }

        let mut bytes = fragment.bytes.clone();
        for reloc in &fragment.relocs {
            // Module-local references were already resolved against the
            // referenced fragment's start; move them to the merged section.
            let local = module.symbols.get(&reloc.symbol).is_some_and(Symbol::is_section);
            let shift = match local {
                true => bases.get(reloc.symbol.as_str()).copied().unwrap_or(0),
                false => 0,
            };
            if shift != 0 {
                add_word(&mut bytes, reloc.offset, shift);
            }
        }

        let section = self
            .sections
            .entry(fragment.name.clone())
            .or_insert_with(|| Section::new(&fragment.name));
        section.bytes.extend_from_slice(&bytes);
        section.relocs.extend(
            fragment
                .relocs
                .iter()
                .map(|r| Reloc::new(r.kind, r.offset.wrapping_add(base), r.symbol.clone())),
        );
    }

    /// Every exported symbol must end up defined inside some section.
    pub fn check_resolved(&self) -> Result<(), Error> {
        match self
            .symbols
            .values()
            .find(|s| s.is_only_extern() || s.section.is_none())
        {
            Some(symbol) => Err(Error::UnresolvedSymbol(symbol.name.clone())),
            None => Ok(()),
        }
    }

    /// Merged module in object format: sections unplaced and unrelocated,
    /// exported symbols relative to their section.
    pub fn relocatable(&self) -> ObjectModule {
        let mut module = ObjectModule::default();
        let mut numbers: HashMap<&str, u32> = HashMap::new();

        for section in self.sections.values() {
            let number = module.symbols.next_number();
            let mut symbol = Symbol::new(section.name.clone(), number);
            symbol.section = number;
            symbol.global = true;
            symbol.external = true;
            symbol.size = Some(section.bytes.len() as u16);
            module.symbols.insert(symbol);
            numbers.insert(&section.name, number);
            module.sections.push(SectionData {
                name: section.name.clone(),
                bytes: section.bytes.clone(),
                relocs: section.relocs.clone(),
            });
        }

        for label in self.symbols.values().filter(|s| !s.is_section) {
            let number = module.symbols.next_number();
            let mut symbol = Symbol::new(label.name.clone(), number);
            symbol.section = label
                .section
                .as_deref()
                .and_then(|s| numbers.get(s).copied())
                .unwrap_or(0);
            symbol.value = label.value;
            symbol.global = label.global;
            symbol.external = label.external;
            module.symbols.insert(symbol);
        }
        module
    }
}

fn owning_section(module: &ObjectModule, symbol: &Symbol) -> Option<String> {
    if symbol.is_section() {
        return Some(symbol.name.clone());
    }
    if !symbol.is_defined() {
        return None;
    }
    module.symbols.by_number(symbol.section).map(|s| s.name.clone())
}

/// Adds `value` into the little-endian word at `offset`, wrapping at 16 bits.
pub(crate) fn add_word(bytes: &mut [u8], offset: u16, value: u16) {
    let at = offset as usize;
    if at + 2 > bytes.len() {
        return;
    }
    let old = u16::from_le_bytes([bytes[at], bytes[at + 1]]);
    bytes[at..at + 2].copy_from_slice(&old.wrapping_add(value).to_le_bytes());
}
