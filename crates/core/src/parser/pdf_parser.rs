//! PDF object and content stream parsers.
//!
//! [`PDFParser`] turns tokens into [`PDFObject`]s, recognizing `n g R`
//! references. [`ContentParser`] splits a page content stream into
//! operations, including inline images (`BI ... ID <bytes> EI`).

use super::lexer::{Lexer, Token, is_delimiter, is_whitespace};
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObjRef, PDFObject};

/// Nesting limit for arrays and dictionaries.
const MAX_DEPTH: usize = 256;

/// PDF object parser with two-token lookahead for references.
pub struct PDFParser<'a> {
    lexer: Lexer<'a>,
    lookahead: Vec<(usize, Token)>,
}

impl<'a> PDFParser<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            lookahead: Vec::new(),
        }
    }

    /// Position just after the last consumed token.
    pub fn tell(&self) -> usize {
        self.lookahead
            .last()
            .map_or_else(|| self.lexer.tell(), |(pos, _)| *pos)
    }

    /// Input after the last consumed token.
    pub fn remaining(&self) -> &'a [u8] {
        &self.lexer.data()[self.tell().min(self.lexer.data().len())..]
    }

    fn next_token(&mut self) -> Result<Option<(usize, Token)>> {
        if let Some(tok) = self.lookahead.pop() {
            return Ok(Some(tok));
        }
        self.lexer.next_token().transpose()
    }

    fn push_back(&mut self, tok: (usize, Token)) {
        self.lookahead.push(tok);
    }

    /// Parse the next object.
    pub fn parse_object(&mut self) -> Result<PDFObject> {
        self.parse_nested(0)
    }

    /// Read the next raw token, for callers that expect keywords such as `obj`.
    pub fn next_keyword(&mut self) -> Result<Option<Token>> {
        Ok(self.next_token()?.map(|(_, tok)| tok))
    }

    fn parse_nested(&mut self, depth: usize) -> Result<PDFObject> {
        if depth > MAX_DEPTH {
            return Err(PdfError::TokenError {
                pos: self.tell(),
                msg: "objects nested too deeply".into(),
            });
        }
        let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
        match token {
            Token::Int(n) => Ok(self.maybe_reference(n)?),
            Token::Real(n) => Ok(PDFObject::Real(n)),
            Token::Bool(b) => Ok(PDFObject::Bool(b)),
            Token::Name(s) => Ok(PDFObject::Name(s)),
            Token::String(s) => Ok(PDFObject::String(s)),
            Token::Keyword(kw) => match kw.as_slice() {
                b"null" => Ok(PDFObject::Null),
                b"[" => self.parse_array(depth),
                b"<<" => self.parse_dict(depth),
                _ => Err(PdfError::TokenError {
                    pos,
                    msg: format!("unexpected keyword: {}", String::from_utf8_lossy(&kw)),
                }),
            },
        }
    }

    /// `n` may start an `n g R` reference.
    fn maybe_reference(&mut self, n: i64) -> Result<PDFObject> {
        let Some(second) = self.next_token()? else {
            return Ok(PDFObject::Int(n));
        };
        if let Token::Int(g) = second.1 {
            match self.next_token()? {
                Some((_, ref third)) if third.is_keyword(b"R") => {
                    if let (Ok(objid), Ok(genno)) = (u32::try_from(n), u32::try_from(g)) {
                        return Ok(PDFObject::Ref(PDFObjRef::new(objid, genno)));
                    }
                    return Ok(PDFObject::Null);
                }
                Some(third) => self.push_back(third),
                None => {}
            }
        }
        self.push_back(second);
        Ok(PDFObject::Int(n))
    }

    fn parse_array(&mut self, depth: usize) -> Result<PDFObject> {
        let mut arr = Vec::new();
        loop {
            let tok = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            if tok.1.is_keyword(b"]") {
                break;
            }
            self.push_back(tok);
            arr.push(self.parse_nested(depth + 1)?);
        }
        Ok(PDFObject::Array(arr))
    }

    fn parse_dict(&mut self, depth: usize) -> Result<PDFObject> {
        let mut dict = PDFDict::new();
        loop {
            let (pos, tok) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            let key = match tok {
                Token::Keyword(ref kw) if kw == b">>" => break,
                Token::Name(name) => name,
                _ => {
                    return Err(PdfError::TokenError {
                        pos,
                        msg: "expected name as dict key".into(),
                    });
                }
            };
            // A key directly followed by ">>" has no value; drop it.
            let next = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            if next.1.is_keyword(b">>") {
                break;
            }
            self.push_back(next);
            let value = self.parse_nested(depth + 1)?;
            if !value.is_null() {
                dict.insert(key, value);
            }
        }
        Ok(PDFObject::Dict(dict))
    }
}

/// Content stream operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// The operator (e.g., "BT", "Tf", "Tj")
    pub operator: Vec<u8>,
    /// Operands for this operation
    pub operands: Vec<PDFObject>,
}

impl Operation {
    /// Operator as text, for logging.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.operator).into_owned()
    }
}

/// Inline image payload from `BI ... ID ... EI`.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub attrs: PDFDict,
    pub data: Vec<u8>,
}

/// Operations recovered from a content stream and the syntax errors that
/// were skipped while reading it.
#[derive(Debug, Default)]
pub struct ParsedContent {
    pub operations: Vec<Operation>,
    pub errors: Vec<PdfError>,
}

/// Content stream parser.
///
/// Inline images are reported as an `EI` operation whose single operand is
/// a stream object carrying the image dictionary and raw bytes.
///
/// Parsing never fails as a whole. A bad token is recorded, the lexer skips
/// to the next whitespace, and the operator it belonged to is dropped along
/// with its operands. A truncated inline image ends the stream.
pub struct ContentParser;

impl ContentParser {
    /// Parse a content stream into operations.
    pub fn parse(data: &[u8]) -> ParsedContent {
        let mut lexer = Lexer::new(data);
        let mut parsed = ParsedContent::default();
        let mut operands: Vec<PDFObject> = Vec::new();
        let mut context_stack: Vec<Vec<PDFObject>> = Vec::new();
        // Set after a token error until the next operator has been dropped.
        let mut broken = false;

        while let Some(result) = lexer.next_token() {
            let token = match result {
                Ok((_, token)) => token,
                Err(e) => {
                    parsed.errors.push(e);
                    resync(&mut lexer);
                    broken = true;
                    continue;
                }
            };
            let kw = match token {
                Token::Keyword(kw) => kw,
                other => {
                    operands.push(token_to_object(other));
                    continue;
                }
            };

            match kw.as_slice() {
                b"[" | b"<<" => {
                    context_stack.push(std::mem::take(&mut operands));
                }
                b"]" | b">>" => {
                    let contents = std::mem::take(&mut operands);
                    operands = context_stack.pop().unwrap_or_default();
                    if kw == b"]" {
                        operands.push(PDFObject::Array(contents));
                    } else {
                        operands.push(PDFObject::Dict(pairs_to_dict(contents)));
                    }
                }
                b"BI" => {
                    operands.clear();
                    match Self::parse_inline_image(&mut lexer) {
                        Ok(image) => parsed.operations.push(Operation {
                            operator: b"EI".to_vec(),
                            operands: vec![PDFObject::from(
                                crate::model::objects::PDFStream::new(image.attrs, image.data),
                            )],
                        }),
                        Err(e) => {
                            parsed.errors.push(e);
                            break;
                        }
                    }
                }
                b"null" => operands.push(PDFObject::Null),
                _ if !context_stack.is_empty() => {
                    // Bare keywords inside an array are malformed; skip them.
                }
                _ if broken => {
                    operands.clear();
                    broken = false;
                }
                _ => parsed.operations.push(Operation {
                    operator: kw,
                    operands: std::mem::take(&mut operands),
                }),
            }
        }

        parsed
    }

    fn parse_inline_image(lexer: &mut Lexer<'_>) -> Result<InlineImage> {
        let mut params = Vec::new();
        loop {
            let (_, tok) = lexer.next_token().ok_or(PdfError::UnexpectedEof)??;
            match tok {
                Token::Keyword(ref k) if k == b"ID" => break,
                Token::Keyword(ref k) if k == b"[" => {
                    let mut items = Vec::new();
                    while let Some(item) = lexer.next_token() {
                        let (_, item) = item?;
                        if item.is_keyword(b"]") {
                            break;
                        }
                        items.push(token_to_object(item));
                    }
                    params.push(PDFObject::Array(items));
                }
                other => params.push(token_to_object(other)),
            }
        }
        let attrs = pairs_to_dict(params);

        // One whitespace byte separates ID from the data.
        let data = lexer.data();
        let mut start = lexer.tell();
        if data.get(start).is_some_and(|&b| is_whitespace(b)) {
            start += 1;
        }
        let end = find_inline_image_end(data, start).ok_or(PdfError::UnexpectedEof)?;
        // Drop the single whitespace byte that precedes EI.
        let payload = data[start..end - 1].to_vec();
        lexer.set_pos(end + 2);
        Ok(InlineImage {
            attrs,
            data: payload,
        })
    }
}

/// Skip the rest of a malformed token, including a closing `>` or `)`.
fn resync(lexer: &mut Lexer<'_>) {
    let data = lexer.data();
    let mut pos = lexer.tell();
    while data
        .get(pos)
        .is_some_and(|&b| !is_whitespace(b) && !is_delimiter(b))
    {
        pos += 1;
    }
    if matches!(data.get(pos), Some(b'>' | b')')) {
        pos += 1;
    }
    lexer.set_pos(pos);
}

/// Find `EI` preceded by whitespace and followed by whitespace or EOF.
fn find_inline_image_end(data: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i + 1 < data.len() {
        if data[i] == b'E'
            && data[i + 1] == b'I'
            && i > from
            && is_whitespace(data[i - 1])
            && data.get(i + 2).is_none_or(|&b| is_whitespace(b))
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn token_to_object(token: Token) -> PDFObject {
    match token {
        Token::Int(n) => PDFObject::Int(n),
        Token::Real(n) => PDFObject::Real(n),
        Token::Bool(b) => PDFObject::Bool(b),
        Token::Name(s) => PDFObject::Name(s),
        Token::String(s) => PDFObject::String(s),
        Token::Keyword(kw) if kw == b"null" => PDFObject::Null,
        Token::Keyword(kw) => PDFObject::Name(String::from_utf8_lossy(&kw).into_owned()),
    }
}

fn pairs_to_dict(items: Vec<PDFObject>) -> PDFDict {
    let mut dict = PDFDict::new();
    let mut iter = items.into_iter();
    while let Some(key) = iter.next() {
        if let PDFObject::Name(name) = key
            && let Some(value) = iter.next()
        {
            dict.insert(name, value);
        }
    }
    dict
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_and_dict() {
        let mut parser = PDFParser::new(b"<< /Pages 2 0 R /Count 3 /Kids [4 0 R 5 0 R] >>");
        let obj = parser.parse_object().unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict["Pages"], PDFObject::Ref(PDFObjRef::new(2, 0)));
        assert_eq!(dict["Count"], PDFObject::Int(3));
        assert_eq!(dict["Kids"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn integers_not_followed_by_r_stay_integers() {
        let mut parser = PDFParser::new(b"[1 2 3]");
        let obj = parser.parse_object().unwrap();
        assert_eq!(
            obj,
            PDFObject::Array(vec![PDFObject::Int(1), PDFObject::Int(2), PDFObject::Int(3)])
        );
    }

    #[test]
    fn tell_points_after_object() {
        let data = b"<< /Length 5 >>\nstream\nhello";
        let mut parser = PDFParser::new(data);
        parser.parse_object().unwrap();
        assert!(parser.remaining().starts_with(b"\nstream"));
    }

    #[test]
    fn content_ops_with_arrays() {
        let ops = ContentParser::parse(b"q 1 0 0 1 10 20 cm [(A) -120 (B)] TJ Q").operations;
        let names: Vec<String> = ops.iter().map(Operation::name).collect();
        assert_eq!(names, vec!["q", "cm", "TJ", "Q"]);
        assert_eq!(ops[1].operands.len(), 6);
        assert_eq!(ops[2].operands[0].as_array().unwrap().len(), 3);
    }

    #[test]
    fn inline_image_payload_is_raw() {
        let ops = ContentParser::parse(b"BI /W 2 /H 1 /BPC 8 /CS /G ID \x00\xff EI Q").operations;
        assert_eq!(ops.len(), 2);
        let stream = ops[0].operands[0].as_stream().unwrap();
        assert_eq!(stream.get_rawdata(), b"\x00\xff");
        assert_eq!(stream.get("W"), Some(&PDFObject::Int(2)));
        assert_eq!(ops[1].name(), "Q");
    }

    #[test]
    fn bad_token_drops_only_its_operator() {
        let parsed = ContentParser::parse(b"0 0 9 9 re f <zz> Tj [(a) <q>] TJ 1 g");
        let names: Vec<String> = parsed.operations.iter().map(Operation::name).collect();
        assert_eq!(names, vec!["re", "f", "g"]);
        assert_eq!(parsed.errors.len(), 2);
        assert!(matches!(parsed.errors[0], PdfError::TokenError { .. }));
    }

    #[test]
    fn truncated_inline_image_keeps_earlier_operations() {
        let parsed = ContentParser::parse(b"q 0 0 9 9 re f BI /W 1 /H 1");
        let names: Vec<String> = parsed.operations.iter().map(Operation::name).collect();
        assert_eq!(names, vec!["q", "re", "f"]);
        assert!(matches!(parsed.errors.as_slice(), [PdfError::UnexpectedEof]));
    }

    #[test]
    fn unterminated_string_ends_stream() {
        let parsed = ContentParser::parse(b"1 g (never closed Tj");
        assert_eq!(parsed.operations.len(), 1);
        assert_eq!(parsed.errors.len(), 1);
    }
}
