//! Installing and removing Standard security handler encryption.

use super::doc::Document;
use super::security::{
    AccessPermission, Aes256Handler, Rc4AesHandler, SecurityHandler, open_security_handler,
};
use crate::model::objects::PDFObject;
use crate::{PdfError, Result};
use rand::RngCore;
use std::sync::Arc;
use tracing::debug;

/// AES key size used when encrypting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyLength {
    /// V4/R4, AESV2 crypt filter.
    Aes128,
    /// V5/R6, AESV3 crypt filter.
    #[default]
    Aes256,
}

impl KeyLength {
    pub const fn bits(self) -> u32 {
        match self {
            Self::Aes128 => 128,
            Self::Aes256 => 256,
        }
    }
}

impl TryFrom<u32> for KeyLength {
    type Error = PdfError;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            128 => Ok(Self::Aes128),
            256 => Ok(Self::Aes256),
            other => Err(PdfError::InvalidArgument(format!(
                "unsupported key length {other}, expected 128 or 256"
            ))),
        }
    }
}

/// Options for [`encrypt`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptOptions {
    pub user_password: String,
    /// Defaults to the user password when `None`.
    pub owner_password: Option<String>,
    pub key_length: KeyLength,
    pub permissions: AccessPermission,
}

impl EncryptOptions {
    /// Same password for user and owner, every permission granted.
    pub fn new(password: impl Into<String>, key_length: KeyLength) -> Self {
        Self {
            user_password: password.into(),
            owner_password: None,
            key_length,
            permissions: AccessPermission::all(),
        }
    }
}

/// True when `doc` carries an encryption dictionary.
pub fn is_encrypted(doc: &Document) -> bool {
    doc.is_encrypted()
}

/// Return a copy of `doc` that is encrypted when serialized.
pub fn encrypt(doc: &Document, options: &EncryptOptions) -> Result<Document> {
    if doc.is_encrypted() {
        return Err(PdfError::AlreadyEncrypted);
    }
    let mut out = doc.clone();
    let file_id = match out.file_id() {
        Some(id) => id.to_vec(),
        None => {
            let id = generate_file_id();
            out.trailer.insert(
                "ID".into(),
                PDFObject::Array(vec![
                    PDFObject::String(id.clone()),
                    PDFObject::String(id.clone()),
                ]),
            );
            id
        }
    };

    let owner = options
        .owner_password
        .as_deref()
        .unwrap_or(&options.user_password);
    let p = options.permissions.to_p();
    let handler: Arc<dyn SecurityHandler> = match options.key_length {
        KeyLength::Aes128 => Arc::new(Rc4AesHandler::create(
            &options.user_password,
            owner,
            p,
            &file_id,
        )?),
        KeyLength::Aes256 => Arc::new(Aes256Handler::create(&options.user_password, owner, p)?),
    };
    out.security = Some(handler);
    // AESV3 needs at least 1.7 (extension level 3), AESV2 at least 1.6.
    if options.key_length == KeyLength::Aes256 && out.version.as_str() < "1.7" {
        out.version = "1.7".into();
    } else if out.version.as_str() < "1.6" {
        out.version = "1.6".into();
    }
    debug!(bits = options.key_length.bits(), "encryption installed");
    Ok(out)
}

/// Return a plain copy of `doc` after checking `password` against it.
pub fn decrypt(doc: &Document, password: &str) -> Result<Document> {
    let Some(dict) = doc.encryption() else {
        return Err(PdfError::NotEncrypted);
    };
    let docid = doc.file_id().unwrap_or_default();
    open_security_handler(&dict.to_dict(), docid, password)?;
    let mut out = doc.clone();
    out.security = None;
    debug!("encryption removed");
    Ok(out)
}

/// Random 16-byte file identifier.
fn generate_file_id() -> Vec<u8> {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    md5::compute(seed).0.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ParseOptions;
    use crate::model::objects::{PDFDict, PDFStream};

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.add_object(PDFStream::new(PDFDict::new(), b"secret content".to_vec()));
        let info = doc.add_object(PDFObject::Dict(PDFDict::from([(
            "Title".to_string(),
            PDFObject::String(b"Quarterly".to_vec()),
        )])));
        doc.trailer_mut().insert("Info".into(), PDFObject::Ref(info));
        doc
    }

    #[test]
    fn encrypt_twice_fails() {
        let once = encrypt(&sample(), &EncryptOptions::new("pw", KeyLength::Aes128)).unwrap();
        assert!(is_encrypted(&once));
        assert!(once.file_id().is_some());
        assert!(matches!(
            encrypt(&once, &EncryptOptions::new("pw", KeyLength::Aes128)),
            Err(PdfError::AlreadyEncrypted)
        ));
    }

    #[test]
    fn decrypt_plain_document_fails() {
        assert!(matches!(
            decrypt(&sample(), "pw"),
            Err(PdfError::NotEncrypted)
        ));
    }

    #[test]
    fn roundtrip_through_bytes() {
        for key_length in [KeyLength::Aes128, KeyLength::Aes256] {
            let sealed = encrypt(&sample(), &EncryptOptions::new("pw", key_length)).unwrap();
            let bytes = sealed.to_bytes().unwrap();
            assert!(!bytes.windows(14).any(|w| w == b"secret content"));

            assert!(matches!(
                Document::parse(&bytes, &ParseOptions::with_password("nope")),
                Err(PdfError::InvalidPassword)
            ));
            let opened = Document::parse(&bytes, &ParseOptions::with_password("pw")).unwrap();
            assert!(opened.is_encrypted());
            assert!(matches!(decrypt(&opened, "wrong"), Err(PdfError::InvalidPassword)));

            let plain = decrypt(&opened, "pw").unwrap();
            assert!(!plain.is_encrypted());
            let stream = plain.get_object(3).unwrap().as_stream().unwrap();
            assert_eq!(stream.get_rawdata(), b"secret content");
            assert_eq!(plain.info().unwrap().title.as_deref(), Some("Quarterly"));
        }
    }

    #[test]
    fn owner_password_opens_too() {
        let options = EncryptOptions {
            owner_password: Some("boss".into()),
            permissions: AccessPermission::PRINT,
            ..EncryptOptions::new("reader", KeyLength::Aes256)
        };
        let bytes = encrypt(&sample(), &options).unwrap().to_bytes().unwrap();
        let opened = Document::parse(&bytes, &ParseOptions::with_password("boss")).unwrap();
        assert_eq!(opened.permissions(), AccessPermission::PRINT);
    }
}
