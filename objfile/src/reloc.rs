use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::Display;

/// How a relocation patches its 16-bit placeholder. Codes 1 and 3 of the
/// text format are never written and are rejected on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Display)]
#[repr(u8)]
pub enum RelocKind {
    #[strum(serialize = "PC_REL")]
    PcRel = 0,
    #[strum(serialize = "SYMBOL_WORD")]
    SymbolWord = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reloc {
    pub kind: RelocKind,
    /// Placeholder position inside the owning section.
    pub offset: u16,
    /// Referenced symbol, or the owning section for module-local references.
    pub symbol: String,
}

impl Reloc {
    pub fn new(kind: RelocKind, offset: u16, symbol: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            symbol: symbol.into(),
        }
    }

    /// `kind:offset:symbol:`
    pub fn to_line(&self) -> String {
        format!("{}:{}:{}:", u8::from(self.kind), self.offset, self.symbol)
    }

    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split(':');
        let kind = fields.next()?.parse::<u8>().ok()?;
        let kind = RelocKind::try_from(kind).ok()?;
        let offset = fields.next()?.parse::<u16>().ok()?;
        let symbol = fields.next()?;
        if symbol.is_empty() || fields.next() != Some("") {
            return None;
        }
        Some(Self::new(kind, offset, symbol))
    }
}
