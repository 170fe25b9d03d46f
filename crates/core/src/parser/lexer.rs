//! PDF tokenizer.
//!
//! Splits PDF syntax into numbers, names, strings and keywords. Delimiters
//! `[ ] << >> { }` come back as keywords and are assembled by the parsers.

use crate::error::{PdfError, Result};

/// Lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer value
    Int(i64),
    /// Floating point value
    Real(f64),
    /// Boolean value
    Bool(bool),
    /// Name (e.g., /Type), with `#xx` escapes resolved
    Name(String),
    /// Keyword/operator (e.g., obj, R, BT, `[`, `<<`)
    Keyword(Vec<u8>),
    /// String (literal or hex)
    String(Vec<u8>),
}

impl Token {
    /// True when this is the keyword `kw`.
    pub fn is_keyword(&self, kw: &[u8]) -> bool {
        matches!(self, Self::Keyword(k) if k == kw)
    }
}

/// Whitespace per PDF 32000 Table 1.
pub const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
}

/// Delimiters per PDF 32000 Table 2.
pub const fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Tokenizer over a borrowed byte slice.
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current position in the input.
    pub const fn tell(&self) -> usize {
        self.pos
    }

    /// Move to an absolute position.
    pub const fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Underlying input.
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Unconsumed input.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Skip whitespace and comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.advance() {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn parse_name(&mut self) -> Token {
        self.pos += 1;
        let mut name = Vec::new();
        while let Some(b) = self.peek() {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let hex = (self.peek(), self.peek_at(1));
                if let (Some(h1), Some(h2)) = hex
                    && h1.is_ascii_hexdigit()
                    && h2.is_ascii_hexdigit()
                {
                    name.push((hex_value(h1) << 4) | hex_value(h2));
                    self.pos += 2;
                }
                // A stray '#' is dropped and the following bytes kept.
                continue;
            }
            name.push(b);
        }
        Token::Name(String::from_utf8(name).unwrap_or_else(|e| {
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }))
    }

    fn parse_number(&mut self) -> Result<Token> {
        let start = self.pos;
        let mut has_dot = false;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                self.pos += 1;
            } else if b == b'.' && !has_dot {
                has_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = std::str::from_utf8(&self.data[start..self.pos]).map_err(|_| {
            PdfError::TokenError {
                pos: start,
                msg: "invalid number".into(),
            }
        })?;
        // Tolerate doubled signs such as "--5" by dropping the extras.
        let text = text.trim_start_matches(['+']);
        if has_dot || text.parse::<i64>().is_err() {
            let val: f64 = match text {
                "-" | "." | "-." | "" => 0.0,
                t => t.parse().map_err(|_| PdfError::TokenError {
                    pos: start,
                    msg: format!("invalid real: {t}"),
                })?,
            };
            Ok(Token::Real(val))
        } else {
            Ok(Token::Int(text.parse().unwrap_or(0)))
        }
    }

    fn parse_literal_string(&mut self) -> Result<Token> {
        self.pos += 1;
        let mut result = Vec::new();
        let mut depth = 1;

        while depth > 0 {
            match self.advance() {
                Some(b'(') => {
                    depth += 1;
                    result.push(b'(');
                }
                Some(b')') => {
                    depth -= 1;
                    if depth > 0 {
                        result.push(b')');
                    }
                }
                Some(b'\\') => match self.advance() {
                    Some(b'n') => result.push(b'\n'),
                    Some(b'r') => result.push(b'\r'),
                    Some(b't') => result.push(b'\t'),
                    Some(b'b') => result.push(0x08),
                    Some(b'f') => result.push(0x0c),
                    Some(b'\r') => {
                        if self.peek() == Some(b'\n') {
                            self.pos += 1;
                        }
                    }
                    Some(b'\n') => {}
                    Some(c @ b'0'..=b'7') => {
                        let mut octal = u32::from(c - b'0');
                        for _ in 0..2 {
                            match self.peek() {
                                Some(d @ b'0'..=b'7') => {
                                    self.pos += 1;
                                    octal = octal * 8 + u32::from(d - b'0');
                                }
                                _ => break,
                            }
                        }
                        result.push((octal & 0xFF) as u8);
                    }
                    Some(c) => result.push(c),
                    None => return Err(PdfError::UnexpectedEof),
                },
                Some(c) => result.push(c),
                None => return Err(PdfError::UnexpectedEof),
            }
        }

        Ok(Token::String(result))
    }

    fn parse_hex_string(&mut self) -> Result<Token> {
        self.pos += 1;
        let mut result = Vec::new();
        let mut high: Option<u8> = None;
        loop {
            match self.advance() {
                Some(b'>') => break,
                Some(c) if c.is_ascii_hexdigit() => match high.take() {
                    Some(h) => result.push((h << 4) | hex_value(c)),
                    None => high = Some(hex_value(c)),
                },
                Some(c) if is_whitespace(c) => {}
                Some(_) => {
                    return Err(PdfError::TokenError {
                        pos: self.pos - 1,
                        msg: "invalid character in hex string".into(),
                    });
                }
                None => return Err(PdfError::UnexpectedEof),
            }
        }
        if let Some(h) = high {
            result.push(h << 4);
        }
        Ok(Token::String(result))
    }

    fn parse_keyword(&mut self) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            // Lone delimiter that no rule claims, e.g. ')' or '}'.
            self.pos += 1;
        }
        match &self.data[start..self.pos] {
            b"true" => Token::Bool(true),
            b"false" => Token::Bool(false),
            kw => Token::Keyword(kw.to_vec()),
        }
    }

    /// Read the next token along with its starting offset.
    pub fn next_token(&mut self) -> Option<Result<(usize, Token)>> {
        self.skip_whitespace();
        let start = self.pos;
        let b = self.peek()?;

        let result = match b {
            b'/' => Ok(self.parse_name()),
            b'(' => self.parse_literal_string(),
            b'<' if self.peek_at(1) == Some(b'<') => {
                self.pos += 2;
                Ok(Token::Keyword(b"<<".to_vec()))
            }
            b'<' => self.parse_hex_string(),
            b'>' if self.peek_at(1) == Some(b'>') => {
                self.pos += 2;
                Ok(Token::Keyword(b">>".to_vec()))
            }
            b'[' | b']' | b'{' | b'}' | b'>' => {
                self.pos += 1;
                Ok(Token::Keyword(vec![b]))
            }
            b'+' | b'-' | b'.' => {
                if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit() || c == b'.' || c == b'-')
                {
                    self.parse_number()
                } else {
                    Ok(self.parse_keyword())
                }
            }
            c if c.is_ascii_digit() => self.parse_number(),
            _ => Ok(self.parse_keyword()),
        };

        Some(result.map(|token| (start, token)))
    }
}

const fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}
