use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Operation code byte, the first byte of every instruction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
    Display,
)]
#[repr(u8)]
pub enum Opcode {
    HALT = 0x00,
    INT = 0x10,
    IRET = 0x20,
    CALL = 0x30,
    RET = 0x40,
    JMP = 0x50,
    JEQ = 0x51,
    JNE = 0x52,
    JGT = 0x53,
    XCHG = 0x60,
    ADD = 0x70,
    SUB = 0x71,
    MUL = 0x72,
    DIV = 0x73,
    CMP = 0x74,
    NOT = 0x80,
    AND = 0x81,
    OR = 0x82,
    XOR = 0x83,
    TEST = 0x84,
    SHL = 0x90,
    SHR = 0x91,
    LDR = 0xA0,
    STR = 0xB0,
}

/// Assembler mnemonic. `PUSH`/`POP` share opcodes with `STR`/`LDR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
pub enum OpKind {
    HALT,
    INT,
    IRET,
    CALL,
    RET,
    JMP,
    JEQ,
    JNE,
    JGT,
    PUSH,
    POP,
    XCHG,
    ADD,
    SUB,
    MUL,
    DIV,
    CMP,
    NOT,
    AND,
    OR,
    XOR,
    TEST,
    SHL,
    SHR,
    LDR,
    STR,
}

/// Operand shape of a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// `halt`
    Bare,
    /// `not r1`
    OneReg,
    /// `add r1, r2`
    TwoReg,
    /// `jmp target`
    Jump,
    /// `ldr r1, operand`
    Data,
    /// `push r1` / `pop r1`
    Stack,
}

impl OpKind {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_uppercase().parse::<Self>() {
            Ok(a) => Ok(a),
            Err(_) => Err(format!("Undefined Op: {s}")),
        }
    }

    pub fn opcode(&self) -> Opcode {
        use OpKind::*;
        match self {
            HALT => Opcode::HALT,
            INT => Opcode::INT,
            IRET => Opcode::IRET,
            CALL => Opcode::CALL,
            RET => Opcode::RET,
            JMP => Opcode::JMP,
            JEQ => Opcode::JEQ,
            JNE => Opcode::JNE,
            JGT => Opcode::JGT,
            PUSH => Opcode::STR,
            POP => Opcode::LDR,
            XCHG => Opcode::XCHG,
            ADD => Opcode::ADD,
            SUB => Opcode::SUB,
            MUL => Opcode::MUL,
            DIV => Opcode::DIV,
            CMP => Opcode::CMP,
            NOT => Opcode::NOT,
            AND => Opcode::AND,
            OR => Opcode::OR,
            XOR => Opcode::XOR,
            TEST => Opcode::TEST,
            SHL => Opcode::SHL,
            SHR => Opcode::SHR,
            LDR => Opcode::LDR,
            STR => Opcode::STR,
        }
    }

    pub fn form(&self) -> Form {
        use OpKind::*;
        match self {
            HALT | IRET | RET => Form::Bare,
            INT | NOT => Form::OneReg,
            XCHG | ADD | SUB | MUL | DIV | CMP | AND | OR | XOR | TEST | SHL | SHR => Form::TwoReg,
            CALL | JMP | JEQ | JNE | JGT => Form::Jump,
            LDR | STR => Form::Data,
            PUSH | POP => Form::Stack,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! test_op {
        ($($name:ident: $src:expr => $op:expr, $form:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    let kind = OpKind::parse($src).unwrap();
                    assert_eq!(kind.opcode(), $op);
                    assert_eq!(kind.form(), $form);
                }
            )*
        }
    }

    test_op! {
        test_halt: "halt" => Opcode::HALT, Form::Bare,
        test_int: "int" => Opcode::INT, Form::OneReg,
        test_call: "call" => Opcode::CALL, Form::Jump,
        test_jgt: "jgt" => Opcode::JGT, Form::Jump,
        test_push: "push" => Opcode::STR, Form::Stack,
        test_pop: "pop" => Opcode::LDR, Form::Stack,
        test_xchg: "xchg" => Opcode::XCHG, Form::TwoReg,
        test_shr: "shr" => Opcode::SHR, Form::TwoReg,
        test_not: "not" => Opcode::NOT, Form::OneReg,
        test_ldr: "ldr" => Opcode::LDR, Form::Data,
        test_str_upper: "STR" => Opcode::STR, Form::Data,
    }

    #[test]
    fn opcode_bytes() {
        assert_eq!(u8::from(Opcode::LDR), 0xA0);
        assert_eq!(Opcode::try_from(0x53u8).ok(), Some(Opcode::JGT));
        assert!(Opcode::try_from(0x11u8).is_err());
        assert!(OpKind::parse("word").is_err());
    }
}
