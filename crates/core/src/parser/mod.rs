//! PDF parsing modules.
//!
//! - `lexer`: tokenizer
//! - `pdf_parser`: object parser and content stream parser

pub mod lexer;
pub mod pdf_parser;

pub use lexer::{Lexer, Token};
pub use pdf_parser::{ContentParser, Operation, PDFParser};
