use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Number(u32),
    Text(Vec<u8>),
    Dollar,
    Percent,
    Star,
    Plus,
    Comma,
    Colon,
    Period,
    LBracket,
    RBracket,
    Error(String),
}

pub struct LineLexer<'a> {
    line: &'a str,
    iter: Peekable<CharIndices<'a>>,
}

impl<'a> LineLexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            line,
            iter: line.char_indices().peekable(),
        }
    }

    pub fn parse(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            let stop = matches!(token, Token::Error(_));
            tokens.push(token);
            if stop {
                break;
            }
        }
        tokens
    }

    fn next_token(&mut self) -> Option<Token> {
        // 0. Skip whitespaces
        while self.iter.next_if(|(_, ch)| ch.is_whitespace()).is_some() {}

        // 1. End of line
        let (start, c) = self.iter.next()?;

        // 2. Comment runs to the end of the line
        if c == '#' {
            return None;
        }

        // 3. Single character token
        if let Some(token) = single_char_token(c) {
            return Some(token);
        }

        // 4. Identifier
        if c.is_ascii_alphabetic() || c == '_' {
            let end = self.word_end(start + c.len_utf8());
            return Some(Token::Ident(self.line[start..end].to_string()));
        }

        // 5. Number literal
        if c.is_ascii_digit() {
            let end = self.word_end(start + c.len_utf8());
            let lexeme = &self.line[start..end];
            return Some(match parse_with_prefix(lexeme) {
                Some(value) => Token::Number(value),
                None => Token::Error(lexeme.to_string()),
            });
        }

        // 6. String literal
        if c == '"' {
            return Some(self.text(start));
        }

        // 7. Error
        Some(Token::Error(c.to_string()))
    }

    fn word_end(&mut self, mut end: usize) -> usize {
        while let Some((ptr, ch)) = self.iter.next_if(|(_, ch)| ch.is_ascii_alphanumeric() || *ch == '_') {
            end = ptr + ch.len_utf8();
        }
        end
    }

    fn text(&mut self, start: usize) -> Token {
        let mut bytes = Vec::new();
        while let Some((_, ch)) = self.iter.next() {
            match ch {
                '"' => return Token::Text(bytes),
                '\\' => {
                    let escaped = match self.iter.next() {
                        Some((_, 'n')) => b'\n',
                        Some((_, 't')) => b'\t',
                        Some((_, 'r')) => b'\r',
                        Some((_, '0')) => 0,
                        Some((_, '\\')) => b'\\',
                        Some((_, '"')) => b'"',
                        _ => return Token::Error(self.line[start..].to_string()),
                    };
                    bytes.push(escaped);
                }
                _ => {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        Token::Error(self.line[start..].to_string())
    }
}

fn single_char_token(c: char) -> Option<Token> {
    match c {
        '$' => Some(Token::Dollar),
        '%' => Some(Token::Percent),
        '*' => Some(Token::Star),
        '+' => Some(Token::Plus),
        ',' => Some(Token::Comma),
        ':' => Some(Token::Colon),
        '.' => Some(Token::Period),
        '[' => Some(Token::LBracket),
        ']' => Some(Token::RBracket),
        _ => None,
    }
}

/// Decimal, or `0x`/`0o`/`0b` prefixed.
pub fn parse_with_prefix(s: &str) -> Option<u32> {
    let (radix, digits) = match s.get(..2) {
        Some("0x") | Some("0X") => (16, &s[2..]),
        Some("0o") => (8, &s[2..]),
        Some("0b") => (2, &s[2..]),
        _ => (10, s),
    };
    u32::from_str_radix(digits, radix).ok()
}

#[cfg(test)]
mod test {
    use super::Token::*;
    use super::*;

    fn ident(s: &str) -> Token {
        Ident(s.to_string())
    }

    macro_rules! case {
        ($($name:ident: $code:expr => $expects:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(LineLexer::new($code).parse(), $expects);
                }
            )*
        }
    }

    case! {
        lex_label_and_data: "loop: ldr r1, [r2 + 0x10] # comment" => vec![
            ident("loop"), Colon, ident("ldr"), ident("r1"), Comma,
            LBracket, ident("r2"), Plus, Number(16), RBracket,
        ],
        lex_immediate: "ldr r0, $value" => vec![ident("ldr"), ident("r0"), Comma, Dollar, ident("value")],
        lex_jump: "jmp *[sp]" => vec![ident("jmp"), Star, LBracket, ident("sp"), RBracket],
        lex_pcrel: "call %func" => vec![ident("call"), Percent, ident("func")],
        lex_directive: ".word 1, 0x00FF, sym" => vec![
            Period, ident("word"), Number(1), Comma, Number(255), Comma, ident("sym"),
        ],
        lex_text: ".ascii \"a\\n\\\"b\"" => vec![Period, ident("ascii"), Text(b"a\n\"b".to_vec())],
        lex_comment_only: "   # nothing here" => vec![],
        lex_bad_number: "ldr r0, $12ab" => vec![ident("ldr"), ident("r0"), Comma, Dollar, Error("12ab".to_string())],
        lex_bad_char: "add r0 ; r1" => vec![ident("add"), ident("r0"), Error(";".to_string())],
        lex_open_text: ".ascii \"abc" => vec![Period, ident("ascii"), Error("\"abc".to_string())],
    }

    #[test]
    fn prefixes() {
        assert_eq!(parse_with_prefix("12"), Some(12));
        assert_eq!(parse_with_prefix("0"), Some(0));
        assert_eq!(parse_with_prefix("0x1F"), Some(31));
        assert_eq!(parse_with_prefix("0b101"), Some(5));
        assert_eq!(parse_with_prefix("0o17"), Some(15));
        assert_eq!(parse_with_prefix("0x"), None);
        assert_eq!(parse_with_prefix("99999999999"), None);
    }
}
