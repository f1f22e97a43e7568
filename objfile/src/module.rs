use std::fmt;

use crate::error::Error;
use crate::reloc::Reloc;
use crate::symbol::{Symbol, SymbolTable, UND};

const END_SYMBOLS: &str = "end symbol table";
const NEW_SECTION: &str = "new section";
const END_SECTION: &str = "end section";
const REL_ENTRIES: &str = "rel entries";
const END_REL_ENTRIES: &str = "end rel entries";
const END_FILE: &str = "end file";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionData {
    pub name: String,
    pub bytes: Vec<u8>,
    pub relocs: Vec<Reloc>,
}

impl SectionData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Text interchange unit between assembler and linker.
#[derive(Debug, Clone, Default)]
pub struct ObjectModule {
    pub symbols: SymbolTable,
    pub sections: Vec<SectionData>,
}

impl fmt::Display for ObjectModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in self.symbols.sorted() {
            writeln!(f, "{}", symbol.to_line())?;
        }
        writeln!(f, "{END_SYMBOLS}")?;
        for section in &self.sections {
            writeln!(f, "{NEW_SECTION}")?;
            writeln!(f, "{}", section.name)?;
            for byte in &section.bytes {
                write!(f, "{:02X}:", byte)?;
            }
            writeln!(f)?;
            if !section.relocs.is_empty() {
                writeln!(f, "{REL_ENTRIES}")?;
                for rel in &section.relocs {
                    writeln!(f, "{}", rel.to_line())?;
                }
                writeln!(f, "{END_REL_ENTRIES}")?;
            }
            writeln!(f, "{END_SECTION}")?;
        }
        writeln!(f, "{END_FILE}")
    }
}

struct Cursor<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Cursor<'a> {
    fn next(&mut self, expected: &'static str) -> Result<(usize, &'a str), Error> {
        self.lines
            .next()
            .map(|(idx, line)| (idx + 1, line.trim_end()))
            .ok_or(Error::UnexpectedEof(expected))
    }

    fn expect(&mut self, expected: &'static str) -> Result<(), Error> {
        let (line, text) = self.next(expected)?;
        if text != expected {
            return Err(Error::Expected {
                expected,
                line,
                found: text.to_string(),
            });
        }
        Ok(())
    }
}

impl ObjectModule {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut cursor = Cursor {
            lines: text.lines().enumerate(),
        };
        let mut module = ObjectModule::default();

        loop {
            let (line, text) = cursor.next(END_SYMBOLS)?;
            if text == END_SYMBOLS {
                break;
            }
            let symbol = Symbol::parse(text).ok_or_else(|| Error::Malformed {
                what: "symbol",
                line,
                text: text.to_string(),
            })?;
            if symbol.name != UND {
                module.symbols.insert(symbol);
            }
        }

        loop {
            let (line, text) = cursor.next(END_FILE)?;
            match text {
                END_FILE => break,
                NEW_SECTION => {}
                _ => {
                    return Err(Error::Expected {
                        expected: NEW_SECTION,
                        line,
                        found: text.to_string(),
                    })
                }
            }
            let (_, name) = cursor.next("section name")?;
            let mut section = SectionData::new(name);

            let (line, code) = cursor.next("section bytes")?;
            section.bytes = parse_bytes(code).ok_or_else(|| Error::Malformed {
                what: "section bytes",
                line,
                text: code.to_string(),
            })?;

            let (line, text) = cursor.next(END_SECTION)?;
            match text {
                END_SECTION => {}
                REL_ENTRIES => {
                    loop {
                        let (line, text) = cursor.next(END_REL_ENTRIES)?;
                        if text == END_REL_ENTRIES {
                            break;
                        }
                        let rel = Reloc::parse(text).ok_or_else(|| Error::Malformed {
                            what: "relocation entry",
                            line,
                            text: text.to_string(),
                        })?;
                        section.relocs.push(rel);
                    }
                    cursor.expect(END_SECTION)?;
                }
                _ => {
                    return Err(Error::Expected {
                        expected: END_SECTION,
                        line,
                        found: text.to_string(),
                    })
                }
            }
            module.sections.push(section);
        }

        Ok(module)
    }

    pub fn section(&self, name: &str) -> Option<&SectionData> {
        self.sections.iter().find(|s| s.name == name)
    }
}

fn parse_bytes(code: &str) -> Option<Vec<u8>> {
    code.split(':')
        .filter(|s| !s.is_empty())
        .map(|s| u8::from_str_radix(s, 16).ok())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reloc::RelocKind;

    const SAMPLE: &str = "\
UND:0:0:false:false:0:0:
main:1:0:true:false:2:-1:
text:1:0:true:true:1:5:
end symbol table
new section
text
A0:1F:00:00:00:
rel entries
2:3:value:
end rel entries
end section
new section
bss

end section
end file
";

    #[test]
    fn parse_sample() {
        let module = ObjectModule::parse(SAMPLE).unwrap();
        assert_eq!(module.symbols.len(), 3);
        assert!(module.symbols.get("text").unwrap().is_section());
        let text = module.section("text").unwrap();
        assert_eq!(text.bytes, vec![0xA0, 0x1F, 0, 0, 0]);
        assert_eq!(text.relocs, vec![Reloc::new(RelocKind::SymbolWord, 3, "value")]);
        assert!(module.section("bss").unwrap().bytes.is_empty());
    }

    #[test]
    fn display_matches_sample() {
        let module = ObjectModule::parse(SAMPLE).unwrap();
        assert_eq!(module.to_string(), SAMPLE);
    }

    #[test]
    fn reports_truncated_input() {
        let text = "UND:0:0:false:false:0:0:\nend symbol table\nnew section\ntext\n";
        assert!(matches!(
            ObjectModule::parse(text),
            Err(Error::UnexpectedEof("section bytes"))
        ));
    }

    #[test]
    fn reports_bad_marker() {
        let text = "end symbol table\nsection\n";
        match ObjectModule::parse(text) {
            Err(Error::Expected { line, found, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(found, "section");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
