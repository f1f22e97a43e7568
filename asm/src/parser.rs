use arch::op::{Form, OpKind};
use arch::reg::Reg;
use strum::EnumString;

use crate::error::Error;
use crate::lexer::{LineLexer, Token};

// ----------------------------------------------------------------------------
// Line

/// One classified source line. Both fields empty means blank or comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub label: Option<String>,
    pub stmt: Option<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Directive(Directive),
    Inst(Inst),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Global(Vec<String>),
    Extern(Vec<String>),
    Section(String),
    Word(Vec<Value>),
    Ascii(Vec<u8>),
    Skip(u16),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum DirectiveKind {
    Global,
    Extern,
    Section,
    Word,
    Ascii,
    Skip,
    End,
}

/// Literal or symbolic 16-bit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(u16),
    Symbol(String),
}

// ----------------------------------------------------------------------------
// Instruction

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inst {
    pub kind: OpKind,
    pub args: Args,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Args {
    None,
    Reg(Reg),
    RegReg(Reg, Reg),
    Jump(Operand),
    Data(Reg, Operand),
}

/// Addressing mode of a jump target or data operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    ImmLiteral(u16),
    ImmSymbol(String),
    MemLiteral(u16),
    MemSymbol(String),
    PcRel(String),
    RegDirect(Reg),
    RegIndirect(Reg),
    RegOffsetLiteral(Reg, u16),
    RegOffsetSymbol(Reg, String),
}

// ----------------------------------------------------------------------------
// Parser

impl Line {
    /// `line` is the 1-based source line number used in errors.
    pub fn parse(code: &str, line: usize) -> Result<Line, Error> {
        let tokens = LineLexer::new(code).parse();
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            line,
        };
        parser.line()
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek2(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos + 1)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn syntax(&self) -> Error {
        Error::SyntaxError(self.line)
    }

    fn expect(&mut self, token: &Token) -> Result<(), Error> {
        match self.eat(token) {
            true => Ok(()),
            false => Err(self.syntax()),
        }
    }

    fn end(&mut self) -> Result<(), Error> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.syntax()),
        }
    }

    fn line(&mut self) -> Result<Line, Error> {
        let label = match (self.peek(), self.peek2()) {
            (Some(Token::Ident(name)), Some(Token::Colon)) => {
                self.pos += 2;
                Some(name.clone())
            }
            _ => None,
        };
        let stmt = match self.peek() {
            None => None,
            Some(Token::Period) => {
                self.pos += 1;
                Some(Stmt::Directive(self.directive()?))
            }
            Some(Token::Ident(_)) => Some(Stmt::Inst(self.inst()?)),
            Some(_) => return Err(self.syntax()),
        };
        self.end()?;
        Ok(Line { label, stmt })
    }

    fn ident(&mut self) -> Result<String, Error> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name.clone()),
            _ => Err(self.syntax()),
        }
    }

    fn literal(&self, value: u32) -> Result<u16, Error> {
        u16::try_from(value).map_err(|_| Error::LiteralTooBig(self.line))
    }

    fn ident_list(&mut self) -> Result<Vec<String>, Error> {
        let mut names = vec![self.ident()?];
        while self.eat(&Token::Comma) {
            names.push(self.ident()?);
        }
        Ok(names)
    }

    fn value(&mut self) -> Result<Value, Error> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Value::Literal(self.literal(*n)?)),
            Some(Token::Ident(name)) => Ok(Value::Symbol(name.clone())),
            _ => Err(self.syntax()),
        }
    }

    fn directive(&mut self) -> Result<Directive, Error> {
        let name = self.ident()?;
        let kind = name.parse::<DirectiveKind>().map_err(|_| self.syntax())?;
        Ok(match kind {
            DirectiveKind::Global => Directive::Global(self.ident_list()?),
            DirectiveKind::Extern => Directive::Extern(self.ident_list()?),
            DirectiveKind::Section => Directive::Section(self.ident()?),
            DirectiveKind::Word => {
                let mut items = vec![self.value()?];
                while self.eat(&Token::Comma) {
                    items.push(self.value()?);
                }
                Directive::Word(items)
            }
            DirectiveKind::Ascii => match self.next() {
                Some(Token::Text(bytes)) if !bytes.is_empty() => Directive::Ascii(bytes.clone()),
                _ => return Err(self.syntax()),
            },
            DirectiveKind::Skip => match self.next() {
                Some(Token::Number(n)) => Directive::Skip(self.literal(*n)?),
                _ => return Err(self.syntax()),
            },
            DirectiveKind::End => Directive::End,
        })
    }

    fn inst(&mut self) -> Result<Inst, Error> {
        let op = self.ident()?;
        let kind = OpKind::parse(&op).map_err(|_| Error::UnknownOperation(self.line, op))?;

        let args = match kind.form() {
            Form::Bare => Args::None,
            Form::OneReg | Form::Stack => Args::Reg(self.reg()?),
            Form::TwoReg => {
                let dst = self.reg()?;
                self.expect(&Token::Comma)?;
                Args::RegReg(dst, self.reg()?)
            }
            Form::Jump => Args::Jump(self.jump_operand()?),
            Form::Data => {
                let dst = self.reg()?;
                self.expect(&Token::Comma)?;
                Args::Data(dst, self.data_operand()?)
            }
        };
        Ok(Inst { kind, args })
    }

    fn reg(&mut self) -> Result<Reg, Error> {
        match self.next() {
            Some(Token::Ident(name)) => Reg::parse(name).map_err(|_| self.syntax()),
            _ => Err(self.syntax()),
        }
    }

    /// `[reg]`, `[reg + lit]`, `[reg + sym]` after the opening bracket.
    fn bracket(&mut self) -> Result<Operand, Error> {
        let reg = self.reg()?;
        if self.eat(&Token::RBracket) {
            return Ok(Operand::RegIndirect(reg));
        }
        self.expect(&Token::Plus)?;
        let operand = match self.value()? {
            Value::Literal(v) => Operand::RegOffsetLiteral(reg, v),
            Value::Symbol(s) => Operand::RegOffsetSymbol(reg, s),
        };
        self.expect(&Token::RBracket)?;
        Ok(operand)
    }

    fn pc_rel(&mut self) -> Result<Operand, Error> {
        Ok(Operand::PcRel(self.ident()?))
    }

    fn data_operand(&mut self) -> Result<Operand, Error> {
        match self.next() {
            Some(Token::Dollar) => Ok(match self.value()? {
                Value::Literal(v) => Operand::ImmLiteral(v),
                Value::Symbol(s) => Operand::ImmSymbol(s),
            }),
            Some(Token::Percent) => self.pc_rel(),
            Some(Token::LBracket) => self.bracket(),
            Some(Token::Number(n)) => Ok(Operand::MemLiteral(self.literal(*n)?)),
            Some(Token::Ident(name)) => Ok(match Reg::parse(name) {
                Ok(reg) => Operand::RegDirect(reg),
                Err(_) => Operand::MemSymbol(name.clone()),
            }),
            _ => Err(self.syntax()),
        }
    }

    fn jump_operand(&mut self) -> Result<Operand, Error> {
        match self.next() {
            Some(Token::Star) => match self.next() {
                Some(Token::LBracket) => self.bracket(),
                Some(Token::Number(n)) => Ok(Operand::MemLiteral(self.literal(*n)?)),
                Some(Token::Ident(name)) => Ok(match Reg::parse(name) {
                    Ok(reg) => Operand::RegDirect(reg),
                    Err(_) => Operand::MemSymbol(name.clone()),
                }),
                _ => Err(self.syntax()),
            },
            Some(Token::Percent) => self.pc_rel(),
            Some(Token::Number(n)) => Ok(Operand::ImmLiteral(self.literal(*n)?)),
            Some(Token::Ident(name)) => Ok(Operand::ImmSymbol(name.clone())),
            _ => Err(self.syntax()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn inst(code: &str) -> Inst {
        match Line::parse(code, 1).unwrap().stmt {
            Some(Stmt::Inst(inst)) => inst,
            other => panic!("not an instruction: {other:?}"),
        }
    }

    fn sym(s: &str) -> String {
        s.to_string()
    }

    macro_rules! test_data {
        ($($name:ident: $code:expr => $operand:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(inst($code).args, Args::Data(Reg::R1, $operand));
                }
            )*
        }
    }

    test_data! {
        data_imm_literal: "ldr r1, $5" => Operand::ImmLiteral(5),
        data_imm_symbol: "ldr r1, $value" => Operand::ImmSymbol(sym("value")),
        data_pc_rel: "ldr r1, %value" => Operand::PcRel(sym("value")),
        data_indirect: "ldr r1, [sp]" => Operand::RegIndirect(Reg::SP),
        data_offset_literal: "ldr r1, [r2 + 0x10]" => Operand::RegOffsetLiteral(Reg::R2, 16),
        data_offset_symbol: "str r1, [psw + field]" => Operand::RegOffsetSymbol(Reg::PSW, sym("field")),
        data_reg_direct: "ldr r1, pc" => Operand::RegDirect(Reg::PC),
        data_mem_literal: "ldr r1, 0xFF00" => Operand::MemLiteral(0xFF00),
        data_mem_symbol: "str r1, counter" => Operand::MemSymbol(sym("counter")),
    }

    macro_rules! test_jump {
        ($($name:ident: $code:expr => $operand:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(inst($code).args, Args::Jump($operand));
                }
            )*
        }
    }

    test_jump! {
        jump_reg_direct: "jmp *r3" => Operand::RegDirect(Reg::R3),
        jump_mem_literal: "call *0x20" => Operand::MemLiteral(0x20),
        jump_mem_symbol: "jeq *table" => Operand::MemSymbol(sym("table")),
        jump_pc_rel: "jne %loop" => Operand::PcRel(sym("loop")),
        jump_indirect: "jgt *[r1]" => Operand::RegIndirect(Reg::R1),
        jump_offset_literal: "jmp *[r1 + 4]" => Operand::RegOffsetLiteral(Reg::R1, 4),
        jump_offset_symbol: "jmp *[r1 + tbl]" => Operand::RegOffsetSymbol(Reg::R1, sym("tbl")),
        jump_imm_literal: "jmp 256" => Operand::ImmLiteral(256),
        jump_imm_symbol: "call func" => Operand::ImmSymbol(sym("func")),
    }

    #[test]
    fn classify_lines() {
        let blank = Line::parse("   # only a comment", 1).unwrap();
        assert_eq!(blank, Line { label: None, stmt: None });

        let label = Line::parse("start:  # entry", 1).unwrap();
        assert_eq!(label.label.as_deref(), Some("start"));
        assert_eq!(label.stmt, None);

        let labeled = Line::parse("loop: add r1, r2", 1).unwrap();
        assert_eq!(labeled.label.as_deref(), Some("loop"));
        assert_eq!(
            labeled.stmt,
            Some(Stmt::Inst(Inst {
                kind: OpKind::ADD,
                args: Args::RegReg(Reg::R1, Reg::R2),
            }))
        );

        let data = Line::parse("foo: .word 42", 1).unwrap();
        assert_eq!(data.stmt, Some(Stmt::Directive(Directive::Word(vec![Value::Literal(42)]))));
    }

    #[test]
    fn directives() {
        let parse = |code| match Line::parse(code, 1).unwrap().stmt {
            Some(Stmt::Directive(d)) => d,
            other => panic!("not a directive: {other:?}"),
        };
        assert_eq!(parse(".global a, b"), Directive::Global(vec![sym("a"), sym("b")]));
        assert_eq!(parse(".extern x"), Directive::Extern(vec![sym("x")]));
        assert_eq!(parse(".section text"), Directive::Section(sym("text")));
        assert_eq!(
            parse(".word 1, 0xFFFF, sym"),
            Directive::Word(vec![Value::Literal(1), Value::Literal(0xFFFF), Value::Symbol(sym("sym"))])
        );
        assert_eq!(parse(".ascii \"hi\""), Directive::Ascii(b"hi".to_vec()));
        assert_eq!(parse(".skip 4"), Directive::Skip(4));
        assert_eq!(parse(".end"), Directive::End);
    }

    #[test]
    fn errors_carry_line() {
        assert!(matches!(Line::parse(".word 65536", 7), Err(Error::LiteralTooBig(7))));
        assert!(matches!(Line::parse(".bogus", 3), Err(Error::SyntaxError(3))));
        assert!(matches!(Line::parse("add r1 r2", 4), Err(Error::SyntaxError(4))));
        assert!(matches!(Line::parse("ldr r1, [r2 + ]", 5), Err(Error::SyntaxError(5))));
        assert!(matches!(Line::parse("halt r1", 6), Err(Error::SyntaxError(6))));
        assert!(matches!(Line::parse("ldr r9, $1", 8), Err(Error::SyntaxError(8))));
        assert!(matches!(
            Line::parse("mov r1, r2", 9),
            Err(Error::UnknownOperation(9, _))
        ));
    }
}
