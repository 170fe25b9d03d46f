//! AES-CBC helpers for the Standard security handler.

use crate::error::{PdfError, Result};
use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cbc::{Decryptor, Encryptor};

type Aes128CbcDec = Decryptor<aes::Aes128>;
type Aes256CbcDec = Decryptor<aes::Aes256>;
type Aes128CbcEnc = Encryptor<aes::Aes128>;
type Aes256CbcEnc = Encryptor<aes::Aes256>;

fn check_iv(iv: &[u8]) -> Result<()> {
    if iv.len() != 16 {
        return Err(PdfError::EncryptionError(format!(
            "AES IV must be 16 bytes, got {}",
            iv.len()
        )));
    }
    Ok(())
}

fn bad_key(len: usize) -> PdfError {
    PdfError::EncryptionError(format!("AES key must be 16 or 32 bytes, got {len}"))
}

/// Decrypt without removing padding. `data` must be a multiple of 16 bytes.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_iv(iv)?;
    let mut buf = data.to_vec();
    let res = match key.len() {
        16 => Aes128CbcDec::new(key.into(), iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map(|_| ()),
        32 => Aes256CbcDec::new(key.into(), iv.into())
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map(|_| ()),
        n => return Err(bad_key(n)),
    };
    res.map_err(|_| PdfError::EncryptionError("AES data is not block aligned".into()))?;
    Ok(buf)
}

/// Encrypt without padding. `data` must be a multiple of 16 bytes.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_iv(iv)?;
    if data.len() % 16 != 0 {
        return Err(PdfError::EncryptionError(
            "AES data is not block aligned".into(),
        ));
    }
    let mut buf = data.to_vec();
    let len = buf.len();
    let res = match key.len() {
        16 => Aes128CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map(|_| ()),
        32 => Aes256CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map(|_| ()),
        n => return Err(bad_key(n)),
    };
    res.map_err(|_| PdfError::EncryptionError("AES encryption failed".into()))?;
    Ok(buf)
}

/// Encrypt with PKCS#7 padding and prepend `iv`, as PDF strings and streams
/// are stored.
pub fn aes_cbc_encrypt_padded(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    let pad_len = 16 - data.len() % 16;
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);

    let ciphertext = aes_cbc_encrypt(key, iv, &padded)?;
    let mut out = Vec::with_capacity(16 + ciphertext.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt an IV-prefixed payload and strip its padding.
///
/// Payloads shorter than one block decrypt to nothing; a bad tail length is
/// tolerated by keeping the aligned prefix.
pub fn aes_cbc_decrypt_prefixed(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 16 {
        return Ok(Vec::new());
    }
    let (iv, body) = data.split_at(16);
    let aligned = body.len() - body.len() % 16;
    if aligned == 0 {
        return Ok(Vec::new());
    }
    let plain = aes_cbc_decrypt(key, iv, &body[..aligned])?;
    Ok(unpad_aes(&plain).to_vec())
}

/// Remove PKCS#7 padding from AES-decrypted data.
///
/// Returns data unchanged if padding is invalid:
/// - Padding byte value is 0 or > 16
/// - Not enough bytes for claimed padding
/// - Padding bytes are not all equal to the padding length
pub fn unpad_aes(data: &[u8]) -> &[u8] {
    let Some(&last) = data.last() else {
        return data;
    };
    let pad_len = last as usize;
    if pad_len == 0 || pad_len > 16 || pad_len > data.len() {
        return data;
    }
    let start = data.len() - pad_len;
    if data[start..].iter().all(|&b| b as usize == pad_len) {
        &data[..start]
    } else {
        data
    }
}
