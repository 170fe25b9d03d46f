//! Standard security handler.
//!
//! Reads every Standard handler revision (R2-R6) and writes two of them:
//! V4/R4 with AES-128 crypt filters and V5/R6 with AES-256.

use super::saslprep::saslprep;
use crate::codec::aes::{
    aes_cbc_decrypt, aes_cbc_decrypt_prefixed, aes_cbc_encrypt, aes_cbc_encrypt_padded,
};
use crate::codec::arcfour::Arcfour;
use crate::model::objects::{PDFDict, PDFObject, dict_int, dict_name};
use crate::{PdfError, Result};
use rand::RngCore;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::sync::Arc;

/// Password padding constant from PDF spec.
pub const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Permission flags carried in `/P`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AccessPermission(u32);

impl AccessPermission {
    pub const PRINT: Self = Self(1 << 2);
    pub const MODIFY: Self = Self(1 << 3);
    pub const COPY: Self = Self(1 << 4);
    pub const ANNOTATE: Self = Self(1 << 5);
    pub const FILL_FORMS: Self = Self(1 << 8);
    pub const EXTRACT_FOR_ACCESSIBILITY: Self = Self(1 << 9);
    pub const ASSEMBLE: Self = Self(1 << 10);
    pub const PRINT_HIGH_QUALITY: Self = Self(1 << 11);

    const USER_BITS: u32 = 0b1111_0011_1100;
    /// Bits 7-8 and 13-32 must be set; bits 1-2 must be clear.
    const RESERVED_SET: u32 = 0xFFFF_F0C0;

    /// No permissions granted.
    pub const fn none() -> Self {
        Self(0)
    }

    /// Every permission granted.
    pub const fn all() -> Self {
        Self(Self::USER_BITS)
    }

    /// Decode a `/P` value.
    pub const fn from_p(p: i32) -> Self {
        Self(p as u32 & Self::USER_BITS)
    }

    /// Encode as a `/P` value with the reserved bits filled in.
    pub const fn to_p(self) -> i32 {
        ((self.0 & Self::USER_BITS) | Self::RESERVED_SET) as i32
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl Default for AccessPermission {
    fn default() -> Self {
        Self::all()
    }
}

impl std::ops::BitOr for AccessPermission {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for AccessPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(AccessPermission, &str); 8] = [
            (AccessPermission::PRINT, "print"),
            (AccessPermission::MODIFY, "modify"),
            (AccessPermission::COPY, "copy"),
            (AccessPermission::ANNOTATE, "annotate"),
            (AccessPermission::FILL_FORMS, "fill-forms"),
            (AccessPermission::EXTRACT_FOR_ACCESSIBILITY, "accessibility"),
            (AccessPermission::ASSEMBLE, "assemble"),
            (AccessPermission::PRINT_HIGH_QUALITY, "print-hq"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "AccessPermission({})", names.join("|"))
    }
}

/// Crypt filter method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    Identity,
    /// RC4
    V2,
    /// AES-128
    AESV2,
    /// AES-256
    AESV3,
}

impl CryptMethod {
    const fn cfm_name(self) -> &'static str {
        match self {
            Self::Identity => "None",
            Self::V2 => "V2",
            Self::AESV2 => "AESV2",
            Self::AESV3 => "AESV3",
        }
    }
}

/// Parsed `/Encrypt` dictionary of the Standard security handler.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionDictionary {
    pub v: i64,
    pub r: i64,
    /// Key length in bits.
    pub length: i64,
    pub o: Vec<u8>,
    pub u: Vec<u8>,
    pub oe: Option<Vec<u8>>,
    pub ue: Option<Vec<u8>>,
    pub perms: Option<Vec<u8>>,
    pub p: i32,
    pub stream_method: CryptMethod,
    pub string_method: CryptMethod,
    pub encrypt_metadata: bool,
}

impl EncryptionDictionary {
    /// Read the dictionary, resolving crypt filters for V4/V5.
    pub fn from_dict(encrypt: &PDFDict) -> Result<Self> {
        let filter = dict_name(encrypt, "Filter").unwrap_or("Standard");
        if filter != "Standard" {
            return Err(PdfError::EncryptionError(format!(
                "unsupported security handler: {filter}"
            )));
        }
        let v = dict_int(encrypt, "V").unwrap_or(0);
        let r = get_int(encrypt, "R")?;
        let default_method = if v >= 4 {
            CryptMethod::Identity
        } else {
            CryptMethod::V2
        };
        let (stream_method, string_method) = if v >= 4 {
            let cf = encrypt.get("CF").and_then(|c| c.as_dict().ok());
            (
                resolve_crypt_method(cf, dict_name(encrypt, "StmF").unwrap_or("Identity"))?,
                resolve_crypt_method(cf, dict_name(encrypt, "StrF").unwrap_or("Identity"))?,
            )
        } else {
            (default_method, default_method)
        };
        let length = match v {
            1 => 40,
            5 => 256,
            4 => 128,
            _ => dict_int(encrypt, "Length").unwrap_or(40).clamp(40, 128),
        };

        Ok(Self {
            v,
            r,
            length,
            o: get_bytes(encrypt, "O")?,
            u: get_bytes(encrypt, "U")?,
            oe: encrypt.get("OE").and_then(|o| o.as_string().ok()).map(<[u8]>::to_vec),
            ue: encrypt.get("UE").and_then(|o| o.as_string().ok()).map(<[u8]>::to_vec),
            perms: encrypt.get("Perms").and_then(|o| o.as_string().ok()).map(<[u8]>::to_vec),
            p: get_int(encrypt, "P")? as i32,
            stream_method,
            string_method,
            encrypt_metadata: encrypt
                .get("EncryptMetadata")
                .and_then(|b| b.as_bool().ok())
                .unwrap_or(true),
        })
    }

    /// Build the `/Encrypt` dictionary written to the trailer.
    pub fn to_dict(&self) -> PDFDict {
        let mut dict = PDFDict::new();
        dict.insert("Filter".into(), PDFObject::name("Standard"));
        dict.insert("V".into(), PDFObject::Int(self.v));
        dict.insert("R".into(), PDFObject::Int(self.r));
        dict.insert("Length".into(), PDFObject::Int(self.length));
        dict.insert("O".into(), PDFObject::String(self.o.clone()));
        dict.insert("U".into(), PDFObject::String(self.u.clone()));
        dict.insert("P".into(), PDFObject::Int(i64::from(self.p)));
        for (key, value) in [("OE", &self.oe), ("UE", &self.ue), ("Perms", &self.perms)] {
            if let Some(bytes) = value {
                dict.insert(key.into(), PDFObject::String(bytes.clone()));
            }
        }
        if self.v >= 4 {
            let filter = PDFDict::from([
                ("Type".to_string(), PDFObject::name("CryptFilter")),
                (
                    "CFM".to_string(),
                    PDFObject::name(self.stream_method.cfm_name()),
                ),
                ("AuthEvent".to_string(), PDFObject::name("DocOpen")),
                ("Length".to_string(), PDFObject::Int(self.length / 8)),
            ]);
            dict.insert(
                "CF".into(),
                PDFObject::Dict(PDFDict::from([("StdCF".to_string(), PDFObject::Dict(filter))])),
            );
            dict.insert("StmF".into(), PDFObject::name("StdCF"));
            dict.insert("StrF".into(), PDFObject::name("StdCF"));
            if !self.encrypt_metadata {
                dict.insert("EncryptMetadata".into(), PDFObject::Bool(false));
            }
        }
        dict
    }

    pub const fn permissions(&self) -> AccessPermission {
        AccessPermission::from_p(self.p)
    }

    /// Human readable algorithm name.
    pub fn algorithm(&self) -> String {
        match self.stream_method {
            CryptMethod::AESV3 => "AES-256".into(),
            CryptMethod::AESV2 => "AES-128".into(),
            CryptMethod::V2 => format!("RC4-{}", self.length),
            CryptMethod::Identity => "Identity".into(),
        }
    }
}

fn resolve_crypt_method(cf: Option<&PDFDict>, name: &str) -> Result<CryptMethod> {
    if name == "Identity" {
        return Ok(CryptMethod::Identity);
    }
    let filter = cf
        .and_then(|cf| cf.get(name))
        .and_then(|v| v.as_dict().ok())
        .ok_or_else(|| {
            PdfError::EncryptionError(format!("Crypt filter '{name}' not found in CF"))
        })?;
    match dict_name(filter, "CFM").unwrap_or("None") {
        "V2" => Ok(CryptMethod::V2),
        "AESV2" => Ok(CryptMethod::AESV2),
        "AESV3" => Ok(CryptMethod::AESV3),
        "None" => Ok(CryptMethod::Identity),
        other => Err(PdfError::EncryptionError(format!(
            "Unknown crypt filter method: {other}"
        ))),
    }
}

/// Encrypts and decrypts object payloads for one document.
pub trait SecurityHandler: Send + Sync {
    /// The dictionary this handler was built from.
    fn dictionary(&self) -> &EncryptionDictionary;

    /// Decrypt a string (`attrs == None`) or a stream payload.
    fn decrypt(&self, objid: u32, genno: u32, data: &[u8], attrs: Option<&PDFDict>)
    -> Result<Vec<u8>>;

    /// Encrypt a string (`attrs == None`) or a stream payload.
    fn encrypt(&self, objid: u32, genno: u32, data: &[u8], attrs: Option<&PDFDict>)
    -> Result<Vec<u8>>;
}

impl fmt::Debug for dyn SecurityHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityHandler")
            .field("algorithm", &self.dictionary().algorithm())
            .finish()
    }
}

fn method_for(dict: &EncryptionDictionary, attrs: Option<&PDFDict>) -> CryptMethod {
    match attrs {
        None => dict.string_method,
        Some(attrs) => {
            let is_metadata = dict_name(attrs, "Type") == Some("Metadata");
            let is_xref = dict_name(attrs, "Type") == Some("XRef");
            if is_xref || (is_metadata && !dict.encrypt_metadata) {
                CryptMethod::Identity
            } else {
                dict.stream_method
            }
        }
    }
}

fn random_iv() -> [u8; 16] {
    let mut iv = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}

/// Handler for R2-R4: MD5 key derivation with RC4 or AES-128 payloads.
pub struct Rc4AesHandler {
    dict: EncryptionDictionary,
    key: Vec<u8>,
}

impl Rc4AesHandler {
    /// Authenticate `password` as user password, then as owner password.
    pub fn open(dict: EncryptionDictionary, docid: &[u8], password: &str) -> Result<Self> {
        if !(2..=4).contains(&dict.r) {
            return Err(PdfError::EncryptionError(format!(
                "Unsupported revision: R={}",
                dict.r
            )));
        }
        let password = password.as_bytes();
        let key = authenticate_user(&dict, docid, password)
            .or_else(|| {
                let user = recover_user_password(&dict, password);
                authenticate_user(&dict, docid, &user)
            })
            .ok_or(PdfError::InvalidPassword)?;
        Ok(Self { dict, key })
    }

    /// Build a fresh V4/R4 AES-128 handler.
    pub fn create(user: &str, owner: &str, p: i32, docid: &[u8]) -> Result<Self> {
        let mut dict = EncryptionDictionary {
            v: 4,
            r: 4,
            length: 128,
            o: Vec::new(),
            u: Vec::new(),
            oe: None,
            ue: None,
            perms: None,
            p,
            stream_method: CryptMethod::AESV2,
            string_method: CryptMethod::AESV2,
            encrypt_metadata: true,
        };
        dict.o = compute_o_value(&dict, owner.as_bytes(), user.as_bytes());
        let key = compute_file_key(&dict, docid, user.as_bytes());
        dict.u = compute_u_value(&dict, docid, &key);
        Ok(Self { dict, key })
    }

    fn object_key(&self, objid: u32, genno: u32, aes: bool) -> Vec<u8> {
        let mut key_data = self.key.clone();
        key_data.extend_from_slice(&objid.to_le_bytes()[..3]);
        key_data.extend_from_slice(&genno.to_le_bytes()[..2]);
        if aes {
            key_data.extend_from_slice(b"sAlT");
        }
        let hash = md5::compute(&key_data);
        hash.0[..(self.key.len() + 5).min(16)].to_vec()
    }
}

impl SecurityHandler for Rc4AesHandler {
    fn dictionary(&self) -> &EncryptionDictionary {
        &self.dict
    }

    fn decrypt(
        &self,
        objid: u32,
        genno: u32,
        data: &[u8],
        attrs: Option<&PDFDict>,
    ) -> Result<Vec<u8>> {
        match method_for(&self.dict, attrs) {
            CryptMethod::Identity | CryptMethod::AESV3 => Ok(data.to_vec()),
            CryptMethod::V2 => Ok(Arcfour::apply(&self.object_key(objid, genno, false), data)),
            CryptMethod::AESV2 => {
                aes_cbc_decrypt_prefixed(&self.object_key(objid, genno, true), data)
            }
        }
    }

    fn encrypt(
        &self,
        objid: u32,
        genno: u32,
        data: &[u8],
        attrs: Option<&PDFDict>,
    ) -> Result<Vec<u8>> {
        match method_for(&self.dict, attrs) {
            CryptMethod::Identity | CryptMethod::AESV3 => Ok(data.to_vec()),
            CryptMethod::V2 => Ok(Arcfour::apply(&self.object_key(objid, genno, false), data)),
            CryptMethod::AESV2 => {
                aes_cbc_encrypt_padded(&self.object_key(objid, genno, true), &random_iv(), data)
            }
        }
    }
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
    padded
}

const fn key_bytes(dict: &EncryptionDictionary) -> usize {
    if dict.r >= 3 {
        (dict.length / 8) as usize
    } else {
        5
    }
}

/// Algorithm 2: file key from the user password.
fn compute_file_key(dict: &EncryptionDictionary, docid: &[u8], password: &[u8]) -> Vec<u8> {
    let mut context = md5::Context::new();
    context.consume(pad_password(password));
    context.consume(&dict.o);
    context.consume((dict.p as u32).to_le_bytes());
    context.consume(docid);
    if dict.r >= 4 && !dict.encrypt_metadata {
        context.consume([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut result = context.finalize().0.to_vec();
    let n = key_bytes(dict);
    if dict.r >= 3 {
        for _ in 0..50 {
            result = md5::compute(&result[..n]).0.to_vec();
        }
    }
    result.truncate(n);
    result
}

/// Algorithms 4 and 5: the `/U` value for a file key.
fn compute_u_value(dict: &EncryptionDictionary, docid: &[u8], key: &[u8]) -> Vec<u8> {
    if dict.r == 2 {
        return Arcfour::apply(key, &PASSWORD_PADDING);
    }
    let mut context = md5::Context::new();
    context.consume(PASSWORD_PADDING);
    context.consume(docid);
    let mut result = Arcfour::apply(key, &context.finalize().0);
    for i in 1..20u8 {
        let xor_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        result = Arcfour::apply(&xor_key, &result);
    }
    // 16 significant bytes followed by arbitrary padding.
    let mut padded = result.clone();
    padded.extend_from_slice(&result);
    padded
}

/// RC4 key derived from the owner password (Algorithm 3, steps a-d).
fn owner_key(dict: &EncryptionDictionary, owner: &[u8]) -> Vec<u8> {
    let mut hash = md5::compute(pad_password(owner)).0.to_vec();
    let n = key_bytes(dict);
    if dict.r >= 3 {
        for _ in 0..50 {
            hash = md5::compute(&hash[..n]).0.to_vec();
        }
    }
    hash.truncate(n);
    hash
}

/// Algorithm 3: the `/O` value.
fn compute_o_value(dict: &EncryptionDictionary, owner: &[u8], user: &[u8]) -> Vec<u8> {
    let owner = if owner.is_empty() { user } else { owner };
    let key = owner_key(dict, owner);
    let mut result = Arcfour::apply(&key, &pad_password(user));
    if dict.r >= 3 {
        for i in 1..20u8 {
            let xor_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            result = Arcfour::apply(&xor_key, &result);
        }
    }
    result
}

/// Algorithm 7: decrypt `/O` with the owner key to get the user password.
fn recover_user_password(dict: &EncryptionDictionary, owner: &[u8]) -> Vec<u8> {
    let key = owner_key(dict, owner);
    if dict.r == 2 {
        return Arcfour::apply(&key, &dict.o);
    }
    let mut result = dict.o.clone();
    for i in (0..20u8).rev() {
        let xor_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        result = Arcfour::apply(&xor_key, &result);
    }
    result
}

/// Algorithm 6: check a user password, returning the file key on success.
fn authenticate_user(dict: &EncryptionDictionary, docid: &[u8], password: &[u8]) -> Option<Vec<u8>> {
    let key = compute_file_key(dict, docid, password);
    let computed = compute_u_value(dict, docid, &key);
    let matches = if dict.r == 2 {
        computed.get(..32) == dict.u.get(..32)
    } else {
        dict.u.len() >= 16 && computed[..16] == dict.u[..16]
    };
    matches.then_some(key)
}

/// Handler for V5 (R5/R6): SHA-2 password hashes and a random AES-256 file key.
pub struct Aes256Handler {
    dict: EncryptionDictionary,
    key: Vec<u8>,
}

impl Aes256Handler {
    /// Authenticate `password` as owner, then as user.
    pub fn open(dict: EncryptionDictionary, password: &str) -> Result<Self> {
        if !(5..=6).contains(&dict.r) {
            return Err(PdfError::EncryptionError(format!(
                "V5 handler requires R=5 or R=6, got R={}",
                dict.r
            )));
        }
        for (name, value, len) in [
            ("O", Some(&dict.o), 48),
            ("U", Some(&dict.u), 48),
            ("OE", dict.oe.as_ref(), 32),
            ("UE", dict.ue.as_ref(), 32),
        ] {
            let actual = value.map_or(0, Vec::len);
            if actual < len {
                return Err(PdfError::EncryptionError(format!(
                    "{name} value too short: {actual} bytes, expected {len}"
                )));
            }
        }

        let password = normalize_password(dict.r, password);
        let key = Self::authenticate(&dict, &password)?.ok_or(PdfError::InvalidPassword)?;
        Ok(Self { dict, key })
    }

    fn authenticate(dict: &EncryptionDictionary, password: &[u8]) -> Result<Option<Vec<u8>>> {
        let (o, u) = (&dict.o, &dict.u);
        let zero_iv = [0u8; 16];
        let udata = &u[..48];

        if password_hash(dict.r, password, &o[32..40], Some(udata))? == o[..32] {
            let key_hash = password_hash(dict.r, password, &o[40..48], Some(udata))?;
            let oe = dict.oe.as_deref().unwrap_or_default();
            return aes_cbc_decrypt(&key_hash, &zero_iv, &oe[..32]).map(Some);
        }
        if password_hash(dict.r, password, &u[32..40], None)? == u[..32] {
            let key_hash = password_hash(dict.r, password, &u[40..48], None)?;
            let ue = dict.ue.as_deref().unwrap_or_default();
            return aes_cbc_decrypt(&key_hash, &zero_iv, &ue[..32]).map(Some);
        }
        Ok(None)
    }

    /// Build a fresh V5/R6 handler with random salts and file key.
    pub fn create(user: &str, owner: &str, p: i32) -> Result<Self> {
        let mut rng = rand::thread_rng();
        let mut key = vec![0u8; 32];
        rng.fill_bytes(&mut key);
        let mut salts = [0u8; 32];
        rng.fill_bytes(&mut salts);
        let zero_iv = [0u8; 16];

        let user = normalize_password(6, user);
        let owner = if owner.is_empty() {
            user.clone()
        } else {
            normalize_password(6, owner)
        };

        let mut u = password_hash(6, &user, &salts[0..8], None)?;
        u.extend_from_slice(&salts[0..16]);
        let ue = aes_cbc_encrypt(&password_hash(6, &user, &salts[8..16], None)?, &zero_iv, &key)?;

        let mut o = password_hash(6, &owner, &salts[16..24], Some(&u))?;
        o.extend_from_slice(&salts[16..32]);
        let oe = aes_cbc_encrypt(
            &password_hash(6, &owner, &salts[24..32], Some(&u))?,
            &zero_iv,
            &key,
        )?;

        let mut perms_block = [0u8; 16];
        perms_block[..4].copy_from_slice(&(p as u32).to_le_bytes());
        perms_block[4..8].fill(0xFF);
        perms_block[8] = b'T';
        perms_block[9..12].copy_from_slice(b"adb");
        rng.fill_bytes(&mut perms_block[12..16]);
        let perms = aes_cbc_encrypt(&key, &zero_iv, &perms_block)?;

        let dict = EncryptionDictionary {
            v: 5,
            r: 6,
            length: 256,
            o,
            u,
            oe: Some(oe),
            ue: Some(ue),
            perms: Some(perms),
            p,
            stream_method: CryptMethod::AESV3,
            string_method: CryptMethod::AESV3,
            encrypt_metadata: true,
        };
        Ok(Self { dict, key })
    }
}

impl SecurityHandler for Aes256Handler {
    fn dictionary(&self) -> &EncryptionDictionary {
        &self.dict
    }

    fn decrypt(
        &self,
        _objid: u32,
        _genno: u32,
        data: &[u8],
        attrs: Option<&PDFDict>,
    ) -> Result<Vec<u8>> {
        match method_for(&self.dict, attrs) {
            CryptMethod::AESV3 => aes_cbc_decrypt_prefixed(&self.key, data),
            _ => Ok(data.to_vec()),
        }
    }

    fn encrypt(
        &self,
        _objid: u32,
        _genno: u32,
        data: &[u8],
        attrs: Option<&PDFDict>,
    ) -> Result<Vec<u8>> {
        match method_for(&self.dict, attrs) {
            CryptMethod::AESV3 => aes_cbc_encrypt_padded(&self.key, &random_iv(), data),
            _ => Ok(data.to_vec()),
        }
    }
}

/// R6 passwords go through SASLprep; both revisions cap at 127 bytes.
fn normalize_password(r: i64, password: &str) -> Vec<u8> {
    let prepped = if r == 6 && !password.is_empty() {
        saslprep(password).unwrap_or_else(|_| password.to_string())
    } else {
        password.to_string()
    };
    let mut bytes = prepped.into_bytes();
    bytes.truncate(127);
    bytes
}

fn password_hash(r: i64, password: &[u8], salt: &[u8], udata: Option<&[u8]>) -> Result<Vec<u8>> {
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    if let Some(v) = udata {
        hasher.update(v);
    }
    let k = hasher.finalize().to_vec();
    if r == 5 {
        return Ok(k);
    }
    r6_hash(password, k, udata.unwrap_or_default())
}

/// Algorithm 2.B: the iterated SHA-256/384/512 hash of revision 6.
fn r6_hash(password: &[u8], mut k: Vec<u8>, udata: &[u8]) -> Result<Vec<u8>> {
    let mut round_no = 0u32;
    loop {
        let base: Vec<u8> = password
            .iter()
            .chain(k.iter())
            .chain(udata.iter())
            .copied()
            .collect();
        let k1 = base.repeat(64);
        let e = aes_cbc_encrypt(&k[..16], &k[16..32], &k1)?;

        // Sum of the first 16 bytes mod 3; 256 is 1 mod 3.
        let selector = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
        k = match selector {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };

        round_no += 1;
        let last = e[e.len() - 1];
        if round_no >= 64 && u32::from(last) <= round_no - 32 {
            break;
        }
    }
    k.truncate(32);
    Ok(k)
}

fn get_int(encrypt: &PDFDict, key: &str) -> Result<i64> {
    encrypt
        .get(key)
        .ok_or_else(|| PdfError::EncryptionError(format!("Missing {key} in /Encrypt")))?
        .as_int()
}

fn get_bytes(encrypt: &PDFDict, key: &str) -> Result<Vec<u8>> {
    encrypt
        .get(key)
        .ok_or_else(|| PdfError::EncryptionError(format!("Missing {key} in /Encrypt")))?
        .as_string()
        .map(<[u8]>::to_vec)
}

/// Open the handler described by an `/Encrypt` dictionary.
///
/// A password that matches neither the user nor the owner password yields
/// [`PdfError::InvalidPassword`].
pub fn open_security_handler(
    encrypt: &PDFDict,
    docid: &[u8],
    password: &str,
) -> Result<Arc<dyn SecurityHandler>> {
    let dict = EncryptionDictionary::from_dict(encrypt)?;
    match (dict.v, dict.r) {
        (1 | 2, 2 | 3) | (4, 4) => Ok(Arc::new(Rc4AesHandler::open(dict, docid, password)?)),
        (5, 5 | 6) => Ok(Arc::new(Aes256Handler::open(dict, password)?)),
        (v, r) => Err(PdfError::EncryptionError(format!(
            "Unsupported encryption: V={v}, R={r}"
        ))),
    }
}
