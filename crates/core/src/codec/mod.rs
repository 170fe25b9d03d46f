//! Codec modules for PDF stream compression and encryption.
//!
//! - `aes`: AES-CBC encryption/decryption
//! - `arcfour`: RC4 encryption
//! - `filters`: stream filter chain (Flate, LZW, ASCIIHex, ASCII85, RunLength)

pub mod aes;
pub mod arcfour;
pub mod filters;

pub use aes::{aes_cbc_decrypt, aes_cbc_encrypt, unpad_aes};
pub use arcfour::Arcfour;
pub use filters::{decode_stream, flate_decode, flate_encode};
