use indexmap::IndexMap;

use crate::reloc::RelocKind;

/// Name of the reserved undefined-section entry, always symbol number 0.
pub const UND: &str = "UND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub usize);

/// A reference emitted before the symbol's final value was known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUse {
    pub offset: u16,
    /// Index of the section buffer holding the placeholder.
    pub section: usize,
    pub kind: RelocKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    /// Number of the owning section symbol, 0 while undefined.
    pub section: u32,
    pub value: u16,
    pub global: bool,
    pub external: bool,
    pub number: u32,
    /// `Some` marks a section descriptor.
    pub size: Option<u16>,
    pub uses: Vec<PendingUse>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            section: 0,
            value: 0,
            global: false,
            external: false,
            number,
            size: None,
            uses: vec![],
        }
    }

    pub fn is_section(&self) -> bool {
        self.size.is_some()
    }

    pub fn is_defined(&self) -> bool {
        self.section != 0
    }

    pub fn is_local(&self) -> bool {
        !self.global && !self.external
    }

    pub fn is_only_global(&self) -> bool {
        self.global && !self.external
    }

    /// `name:sectionNumber:value:isGlobal:isExtern:number:size:`
    pub fn to_line(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}:",
            self.name,
            self.section,
            self.value,
            self.global,
            self.external,
            self.number,
            self.size.map(i32::from).unwrap_or(-1)
        )
    }

    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != 8 || !fields[7].is_empty() || fields[0].is_empty() {
            return None;
        }
        let flag = |s: &str| match s {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        };
        let size = match fields[6].parse::<i32>().ok()? {
            -1 => None,
            n => Some(u16::try_from(n).ok()?),
        };
        Some(Self {
            name: fields[0].to_string(),
            section: fields[1].parse().ok()?,
            value: fields[2].parse().ok()?,
            global: flag(fields[3])?,
            external: flag(fields[4])?,
            number: fields[5].parse().ok()?,
            size,
            uses: vec![],
        })
    }
}

/// Symbol arena with a name index. Ids stay valid while the table grows.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    arena: Vec<Symbol>,
    index: IndexMap<String, SymbolId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut und = Symbol::new(UND, 0);
        und.size = Some(0);
        let mut table = Self {
            arena: vec![],
            index: IndexMap::new(),
        };
        table.insert(und);
        table
    }

    /// Number the next created symbol receives.
    pub fn next_number(&self) -> u32 {
        self.arena.len() as u32
    }

    pub fn insert(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.arena.len());
        self.index.insert(symbol.name.clone(), id);
        self.arena.push(symbol);
        id
    }

    /// Looks `name` up, creating an undefined local entry on first mention.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        match self.id(name) {
            Some(id) => id,
            None => {
                let number = self.next_number();
                self.insert(Symbol::new(name, number))
            }
        }
    }

    pub fn id(&self, name: &str) -> Option<SymbolId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.id(name).map(|id| &self.arena[id.0])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        let id = self.id(name)?;
        Some(&mut self.arena[id.0])
    }

    pub fn by_id(&self, id: SymbolId) -> &Symbol {
        &self.arena[id.0]
    }

    pub fn by_id_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.arena[id.0]
    }

    pub fn by_number(&self, number: u32) -> Option<&Symbol> {
        self.arena.iter().find(|s| s.number == number)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Symbols in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.arena.iter()
    }

    /// `UND` first, everything else ordered by name.
    pub fn sorted(&self) -> Vec<&Symbol> {
        let mut rest: Vec<&Symbol> = self.arena.iter().filter(|s| s.name != UND).collect();
        rest.sort_by(|a, b| a.name.cmp(&b.name));
        self.get(UND).into_iter().chain(rest).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn und_is_entry_zero() {
        let table = SymbolTable::new();
        let und = table.by_number(0).unwrap();
        assert_eq!(und.name, UND);
        assert_eq!(und.to_line(), "UND:0:0:false:false:0:0:");
    }

    #[test]
    fn intern_keeps_ids_stable() {
        let mut table = SymbolTable::new();
        let a = table.intern("a");
        let b = table.intern("b");
        assert_eq!(table.intern("a"), a);
        table.by_id_mut(a).value = 10;
        assert_eq!(table.get("a").unwrap().value, 10);
        assert_eq!(table.by_id(b).number, 2);
    }

    #[test]
    fn sorted_keeps_und_first() {
        let mut table = SymbolTable::new();
        table.intern("zeta");
        table.intern("ALPHA");
        table.intern("beta");
        let names: Vec<&str> = table.sorted().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["UND", "ALPHA", "beta", "zeta"]);
    }

    #[test]
    fn line_round_trip() {
        let line = "text:1:0:true:true:1:12:";
        let sym = Symbol::parse(line).unwrap();
        assert!(sym.is_section());
        assert_eq!(sym.to_line(), line);
        let label = Symbol::parse("main:1:4:true:false:2:-1:").unwrap();
        assert!(label.is_only_global());
        assert_eq!(label.size, None);
        assert!(Symbol::parse("main:1:4:yes:false:2:-1:").is_none());
        assert!(Symbol::parse("main:1:4:true:false:2:-1").is_none());
    }
}
