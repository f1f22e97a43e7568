use objfile::{ObjectModule, PendingUse, Reloc, RelocKind, SectionData, Symbol, SymbolId, SymbolTable};

use crate::error::Error;
use crate::parser::{Directive, Line, Stmt, Value};

/// Section buffers stay addressable by 16-bit offsets.
const SECTION_LIMIT: usize = 0xFFFF;

/// Whether the caller should keep feeding lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    End,
}

/// Bytes emitted by one source line, kept for `--dump`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub line: usize,
    pub section: usize,
    pub offset: u16,
    pub bytes: Vec<u8>,
}

/// State of one assembly run.
#[derive(Debug, Default)]
pub struct Assembler {
    symbols: SymbolTable,
    sections: Vec<SectionData>,
    /// Index into `sections` of the open section.
    current: Option<usize>,
    /// Location counter inside the open section.
    lc: u16,
    line: usize,
    listing: Vec<Emitted>,
}

/// Assembles a whole source text into an object module.
pub fn assemble(src: &str) -> Result<ObjectModule, Error> {
    let mut asm = Assembler::new();
    for code in src.lines() {
        if asm.line(code)? == Flow::End {
            break;
        }
    }
    asm.finish()
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1-based number of the last line fed.
    pub fn current_line(&self) -> usize {
        self.line
    }

    pub fn listing(&self) -> &[Emitted] {
        &self.listing
    }

    pub fn section_name(&self, idx: usize) -> &str {
        &self.sections[idx].name
    }

    pub fn line(&mut self, code: &str) -> Result<Flow, Error> {
        self.line += 1;
        let line = Line::parse(code, self.line)?;

        if let Some(label) = &line.label {
            self.define_label(label)?;
        }

        match line.stmt {
            None => Ok(Flow::Continue),
            Some(Stmt::Directive(directive)) => self.directive(directive),
            Some(Stmt::Inst(inst)) => {
                let section = self.open_section()?;
                let encoded = inst.encode();
                if let Some(fixup) = encoded.fixup {
                    self.record_use(&fixup.symbol, section, self.lc.wrapping_add(fixup.at), fixup.kind);
                }
                self.emit(encoded.bytes)?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Closes the open section and resolves every pending use.
    pub fn finish(mut self) -> Result<ObjectModule, Error> {
        self.close_section();
        self.backpatch()?;
        for section in &mut self.sections {
            section.relocs.sort_by_key(|r| r.offset);
        }
        Ok(ObjectModule {
            symbols: self.symbols,
            sections: self.sections,
        })
    }

    fn open_section(&self) -> Result<usize, Error> {
        self.current.ok_or(Error::NoSection(self.line))
    }

    fn section_number(&self, idx: usize) -> u32 {
        self.symbols
            .get(&self.sections[idx].name)
            .map(|s| s.number)
            .unwrap_or(0)
    }

    fn close_section(&mut self) {
        let Some(idx) = self.current else {
            return;
        };
        let size = self.lc;
        if let Some(symbol) = self.symbols.get_mut(&self.sections[idx].name) {
            symbol.size = Some(size);
        }
    }

    fn emit(&mut self, bytes: Vec<u8>) -> Result<(), Error> {
        let idx = self.open_section()?;
        let section = &mut self.sections[idx];
        if section.bytes.len() + bytes.len() > SECTION_LIMIT {
            return Err(Error::SectionTooLarge(self.line));
        }
        section.bytes.extend_from_slice(&bytes);
        self.listing.push(Emitted {
            line: self.line,
            section: idx,
            offset: self.lc,
            bytes,
        });
        self.lc = section.bytes.len() as u16;
        Ok(())
    }

    fn record_use(&mut self, name: &str, section: usize, offset: u16, kind: RelocKind) {
        let id = self.symbols.intern(name);
        self.symbols.by_id_mut(id).uses.push(PendingUse {
            offset,
            section,
            kind,
        });
    }

    fn define_label(&mut self, name: &str) -> Result<(), Error> {
        let section = self.open_section()?;
        let number = self.section_number(section);
        let lc = self.lc;
        let id = self.symbols.intern(name);
        let symbol = self.symbols.by_id_mut(id);
        if symbol.is_section() || symbol.is_defined() {
            return Err(Error::RedefinedLabel(name.to_string()));
        }
        if symbol.external {
            return Err(Error::DefiningExternSymbol(name.to_string()));
        }
        symbol.section = number;
        symbol.value = lc;
        Ok(())
    }

    fn directive(&mut self, directive: Directive) -> Result<Flow, Error> {
        match directive {
            Directive::Global(names) => {
                for name in names {
                    let id = self.symbols.intern(&name);
                    let symbol = self.symbols.by_id_mut(id);
                    if symbol.external {
                        return Err(Error::GlobalExternCollision(name));
                    }
                    symbol.global = true;
                }
            }
            Directive::Extern(names) => {
                for name in names {
                    let id = self.symbols.intern(&name);
                    let symbol = self.symbols.by_id_mut(id);
                    if symbol.global {
                        return Err(Error::ExternGlobalCollision(name));
                    }
                    if symbol.is_defined() {
                        return Err(Error::ImportingDefinedSymbol(name));
                    }
                    symbol.external = true;
                }
            }
            Directive::Section(name) => {
                self.close_section();
                if self.symbols.contains(&name) {
                    return Err(Error::SectionDefined(self.line));
                }
                let number = self.symbols.next_number();
                let mut symbol = Symbol::new(name.clone(), number);
                symbol.section = number;
                symbol.global = true;
                symbol.external = true;
                symbol.size = Some(0);
                self.symbols.insert(symbol);
                self.sections.push(SectionData::new(name));
                self.current = Some(self.sections.len() - 1);
                self.lc = 0;
            }
            Directive::Word(items) => {
                let section = self.open_section()?;
                let mut bytes = Vec::with_capacity(items.len() * 2);
                for item in items {
                    match item {
                        Value::Literal(v) => bytes.extend_from_slice(&v.to_le_bytes()),
                        Value::Symbol(name) => {
                            let offset = self.lc.wrapping_add(bytes.len() as u16);
                            self.record_use(&name, section, offset, RelocKind::SymbolWord);
                            bytes.extend_from_slice(&[0, 0]);
                        }
                    }
                }
                self.emit(bytes)?;
            }
            Directive::Ascii(text) => self.emit(text)?,
            Directive::Skip(n) => self.emit(vec![0; n as usize])?,
            Directive::End => {
                self.close_section();
                return Ok(Flow::End);
            }
        }
        Ok(Flow::Continue)
    }

    /// Local symbols are added into their placeholders and relocated against
    /// their section; global and extern symbols are left to the linker.
    fn backpatch(&mut self) -> Result<(), Error> {
        let mut relocs: Vec<(usize, Reloc)> = vec![];
        let mut patches: Vec<(usize, u16, u16)> = vec![];

        for idx in 0..self.symbols.len() {
            let id = SymbolId(idx);
            let uses = std::mem::take(&mut self.symbols.by_id_mut(id).uses);
            let symbol = self.symbols.by_id(id);
            for usage in uses {
                let target = if symbol.is_local() {
                    if !symbol.is_defined() {
                        return Err(Error::UndefinedLabel(symbol.name.clone()));
                    }
                    patches.push((usage.section, usage.offset, symbol.value));
                    self.symbols
                        .by_number(symbol.section)
                        .map(|owner| owner.name.clone())
                        .unwrap_or_default()
                } else {
                    symbol.name.clone()
                };
                relocs.push((usage.section, Reloc::new(usage.kind, usage.offset, target)));
            }
        }

        for (section, offset, value) in patches {
            let bytes = &mut self.sections[section].bytes;
            let at = offset as usize;
            let old = u16::from_le_bytes([bytes[at], bytes[at + 1]]);
            bytes[at..at + 2].copy_from_slice(&old.wrapping_add(value).to_le_bytes());
        }

        for (section, reloc) in relocs {
            self.sections[section].relocs.push(reloc);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn forward_label_is_backpatched() {
        let module = assemble(
            "\
.section text
    ldr r1, value
    halt
value: .word 7
.end
",
        )
        .unwrap();
        let text = module.section("text").unwrap();
        assert_eq!(text.bytes, vec![0xA0, 0x1F, 0x04, 0x06, 0x00, 0x00, 0x07, 0x00]);
        assert_eq!(text.relocs, vec![Reloc::new(RelocKind::SymbolWord, 3, "text")]);
        let value = module.symbols.get("value").unwrap();
        assert_eq!(value.value, 6);
        assert_eq!(module.symbols.get("text").unwrap().size, Some(8));
    }

    #[test]
    fn global_reference_keeps_symbol_name() {
        let module = assemble(
            "\
.global main
.extern ext
.section code
main: call ext
    ret
",
        )
        .unwrap();
        let code = module.section("code").unwrap();
        assert_eq!(code.bytes[3..5], [0, 0]);
        assert_eq!(code.relocs, vec![Reloc::new(RelocKind::SymbolWord, 3, "ext")]);
        let main = module.symbols.get("main").unwrap();
        assert!(main.is_only_global());
        assert_eq!(main.section, module.symbols.get("code").unwrap().number);
    }

    #[test]
    fn pc_relative_local_adds_value_to_placeholder() {
        let module = assemble(
            "\
.section text
    .skip 4
here: jmp %here
",
        )
        .unwrap();
        let text = module.section("text").unwrap();
        // 0xFFFE + 4
        assert_eq!(text.bytes[7..9], [0x02, 0x00]);
        assert_eq!(text.relocs, vec![Reloc::new(RelocKind::PcRel, 7, "text")]);
    }

    #[test]
    fn stops_at_end() {
        let module = assemble(".section a\n.word 1\n.end\n.word 2\n").unwrap();
        assert_eq!(module.section("a").unwrap().bytes, vec![1, 0]);
    }

    #[test]
    fn line_counter_tracks_blank_lines() {
        let mut asm = Assembler::new();
        asm.line("# header").unwrap();
        asm.line("").unwrap();
        assert!(matches!(asm.line("halt"), Err(Error::NoSection(3))));
        assert_eq!(asm.current_line(), 3);
    }
}
