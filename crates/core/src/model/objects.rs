//! PDF object types.

use crate::codec::filters;
use crate::error::{PdfError, Result};
use bytes::Bytes;
use std::collections::HashMap;

/// Dictionary payload shared by dictionaries and stream headers.
pub type PDFDict = HashMap<String, PDFObject>;

/// A direct PDF value. Indirect objects are stored in the document's
/// object table and referenced through [`PDFObject::Ref`].
#[derive(Debug, Clone, PartialEq)]
pub enum PDFObject {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    /// Name without the leading slash.
    Name(String),
    /// Literal or hex string, as raw bytes.
    String(Vec<u8>),
    Array(Vec<Self>),
    Dict(PDFDict),
    Stream(Box<PDFStream>),
    Ref(PDFObjRef),
}

impl PDFObject {
    pub fn name(name: &str) -> Self {
        Self::Name(name.to_string())
    }

    /// Reference to object `objid`, generation 0.
    pub const fn reference(objid: u32) -> Self {
        Self::Ref(PDFObjRef::new(objid, 0))
    }

    pub fn number_array(values: &[f64]) -> Self {
        Self::Array(values.iter().map(|&v| Self::from_f64(v)).collect())
    }

    /// Integral values become `Int`, everything else `Real`.
    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Self::Int(value as i64)
        } else {
            Self::Real(value)
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn mismatch(&self, expected: &'static str) -> PdfError {
        PdfError::TypeError {
            expected,
            got: self.type_name(),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        if let Self::Bool(b) = self { Ok(*b) } else { Err(self.mismatch("bool")) }
    }

    pub fn as_int(&self) -> Result<i64> {
        if let Self::Int(n) = self { Ok(*n) } else { Err(self.mismatch("int")) }
    }

    /// Int or Real, as `f64`.
    pub fn as_num(&self) -> Result<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Real(x) => Ok(*x),
            _ => Err(self.mismatch("number")),
        }
    }

    pub fn as_name(&self) -> Result<&str> {
        if let Self::Name(n) = self { Ok(n) } else { Err(self.mismatch("name")) }
    }

    pub fn as_string(&self) -> Result<&[u8]> {
        if let Self::String(bytes) = self { Ok(bytes) } else { Err(self.mismatch("string")) }
    }

    pub fn as_array(&self) -> Result<&Vec<Self>> {
        if let Self::Array(items) = self { Ok(items) } else { Err(self.mismatch("array")) }
    }

    /// Dictionaries, and the header dictionary of streams.
    pub fn as_dict(&self) -> Result<&PDFDict> {
        match self {
            Self::Dict(dict) => Ok(dict),
            Self::Stream(stream) => Ok(&stream.attrs),
            _ => Err(self.mismatch("dict")),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut PDFDict> {
        let got = self.type_name();
        match self {
            Self::Dict(dict) => Ok(dict),
            Self::Stream(stream) => Ok(&mut stream.attrs),
            _ => Err(PdfError::TypeError {
                expected: "dict",
                got,
            }),
        }
    }

    pub fn as_stream(&self) -> Result<&PDFStream> {
        if let Self::Stream(stream) = self { Ok(stream) } else { Err(self.mismatch("stream")) }
    }

    /// Short type label used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
        }
    }

    /// Call `f` on every reference reachable inside this object (not following them).
    pub fn for_each_ref(&self, f: &mut impl FnMut(&PDFObjRef)) {
        match self {
            Self::Ref(r) => f(r),
            Self::Array(items) => items.iter().for_each(|item| item.for_each_ref(f)),
            Self::Dict(dict) => dict.values().for_each(|v| v.for_each_ref(f)),
            Self::Stream(stream) => stream.attrs.values().for_each(|v| v.for_each_ref(f)),
            _ => {}
        }
    }

    /// Rewrite every reference inside this object in place.
    pub fn map_refs(&mut self, f: &mut impl FnMut(&PDFObjRef) -> PDFObject) {
        match self {
            Self::Ref(r) => *self = f(r),
            Self::Array(items) => items.iter_mut().for_each(|item| item.map_refs(f)),
            Self::Dict(dict) => dict.values_mut().for_each(|v| v.map_refs(f)),
            Self::Stream(stream) => stream.attrs.values_mut().for_each(|v| v.map_refs(f)),
            _ => {}
        }
    }
}

impl From<PDFDict> for PDFObject {
    fn from(dict: PDFDict) -> Self {
        Self::Dict(dict)
    }
}

impl From<PDFStream> for PDFObject {
    fn from(stream: PDFStream) -> Self {
        Self::Stream(Box::new(stream))
    }
}

/// `objid genno R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PDFObjRef {
    pub objid: u32,
    pub genno: u32,
}

impl PDFObjRef {
    pub const fn new(objid: u32, genno: u32) -> Self {
        Self { objid, genno }
    }
}

/// A stream: header dictionary plus payload.
///
/// `rawdata` is the encoded payload exactly as it is (or will be) stored in
/// the file, after any decryption has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PDFStream {
    pub attrs: PDFDict,
    rawdata: Bytes,
}

impl PDFStream {
    pub fn new(attrs: PDFDict, rawdata: impl Into<Bytes>) -> Self {
        Self {
            attrs,
            rawdata: rawdata.into(),
        }
    }

    /// Create a Flate-compressed stream from plain bytes.
    pub fn flate(mut attrs: PDFDict, plain: &[u8]) -> Result<Self> {
        let encoded = filters::flate_encode(plain)?;
        attrs.insert("Filter".into(), PDFObject::name("FlateDecode"));
        attrs.remove("DecodeParms");
        Ok(Self::new(attrs, encoded))
    }

    /// Payload as stored, still filtered.
    pub fn get_rawdata(&self) -> &[u8] {
        self.rawdata.as_ref()
    }

    /// Replace the raw payload, keeping the dictionary.
    pub fn set_rawdata(&mut self, data: impl Into<Bytes>) {
        self.rawdata = data.into();
    }

    /// Decode the payload through every filter except image codecs.
    ///
    /// Image filters (DCTDecode, JPXDecode, ...) are left applied; callers
    /// check [`filters::image_filter`] to hand such data to the image decoder.
    pub fn decode(&self) -> Result<Vec<u8>> {
        filters::decode_stream(&self.rawdata, &self.attrs)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&PDFObject> {
        self.attrs.get(name)
    }

    /// `/Type` of the stream, if any.
    pub fn type_name(&self) -> Option<&str> {
        self.get("Type").and_then(|t| t.as_name().ok())
    }
}

/// Look up `key` and read it as a number.
pub fn dict_num(dict: &PDFDict, key: &str) -> Option<f64> {
    dict.get(key).and_then(|v| v.as_num().ok())
}

/// Look up `key` and read it as an integer.
pub fn dict_int(dict: &PDFDict, key: &str) -> Option<i64> {
    dict.get(key).and_then(|v| v.as_int().ok())
}

/// Look up `key` and read it as a name.
pub fn dict_name<'a>(dict: &'a PDFDict, key: &str) -> Option<&'a str> {
    dict.get(key).and_then(|v| v.as_name().ok())
}
