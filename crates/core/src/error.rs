//! Error types for the bluepdf engine.

use thiserror::Error;

/// Primary error type for every engine operation.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF object not found: {0}")]
    ObjectNotFound(u32),

    #[error("no valid xref table found")]
    NoValidXRef,

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("unsupported PDF version {0}")]
    UnsupportedVersion(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("SASLprep: {0}")]
    SaslPrepError(String),

    #[error("render error on page {page}: {msg}")]
    Render { page: usize, msg: String },

    #[error("invalid page range {start}..={end} for a document with {page_count} pages")]
    InvalidRange {
        start: usize,
        end: usize,
        page_count: usize,
    },

    #[error("input document is encrypted")]
    EncryptedInput,

    #[error("document is already encrypted")]
    AlreadyEncrypted,

    #[error("document is not encrypted")]
    NotEncrypted,

    #[error("incorrect password")]
    InvalidPassword,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("document is being modified by another task")]
    DocumentBusy,

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
