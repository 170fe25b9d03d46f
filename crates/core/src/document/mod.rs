//! PDF document model: reading, writing, page tree and security.
//!
//! - `doc` - the in-memory [`Document`] object table
//! - `reader` - header, xref chain and object stream parsing
//! - `repair` - recovery scan for broken cross-reference data
//! - `page` - page tree walk with inherited attributes
//! - `writer` - deterministic serializer
//! - `security` - Standard security handler (R2-R6)
//! - `encrypt` - installing and removing encryption
//! - `saslprep` - RFC 4013 SASLprep for password normalization

pub mod doc;
pub mod encrypt;
pub mod page;
pub mod reader;
mod repair;
pub mod saslprep;
pub mod security;
pub mod writer;

pub use doc::{Document, DocumentInfo, MAX_OBJECT_ID, decode_text_string};
pub use encrypt::{EncryptOptions, KeyLength, decrypt, encrypt, is_encrypted};
pub use page::Page;
pub use reader::{MMAP_THRESHOLD, ParseOptions};
pub use saslprep::saslprep;
pub use security::{
    AccessPermission, CryptMethod, EncryptionDictionary, PASSWORD_PADDING, SecurityHandler,
    open_security_handler,
};
