//! Stream filter pipeline.
//!
//! Decodes FlateDecode (with PNG/TIFF predictors), LZWDecode, ASCIIHexDecode,
//! ASCII85Decode and RunLengthDecode. Image codecs (DCTDecode, JPXDecode,
//! CCITTFaxDecode, JBIG2Decode) terminate the chain and are left for the
//! raster pipeline.

use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject, dict_int};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};
use weezl::{BitOrder, decode::Decoder};

/// Filters whose output is an encoded image rather than raw samples.
const IMAGE_FILTERS: [&str; 4] = ["DCTDecode", "JPXDecode", "CCITTFaxDecode", "JBIG2Decode"];

/// Normalize `/Filter` into a list of names, expanding abbreviations.
pub fn filter_names(attrs: &PDFDict) -> Vec<String> {
    let names: Vec<&str> = match attrs.get("Filter").or_else(|| attrs.get("F")) {
        Some(PDFObject::Name(name)) => vec![name.as_str()],
        Some(PDFObject::Array(items)) => items.iter().filter_map(|o| o.as_name().ok()).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .map(|name| {
            match name {
                "Fl" => "FlateDecode",
                "LZW" => "LZWDecode",
                "AHx" => "ASCIIHexDecode",
                "A85" => "ASCII85Decode",
                "RL" => "RunLengthDecode",
                "DCT" => "DCTDecode",
                "CCF" => "CCITTFaxDecode",
                other => other,
            }
            .to_string()
        })
        .collect()
}

/// The image codec left at the end of the filter chain, if any.
pub fn image_filter(attrs: &PDFDict) -> Option<String> {
    filter_names(attrs)
        .into_iter()
        .find(|name| IMAGE_FILTERS.contains(&name.as_str()))
}

fn decode_parms(attrs: &PDFDict, index: usize) -> Option<&PDFDict> {
    match attrs.get("DecodeParms").or_else(|| attrs.get("DP")) {
        Some(PDFObject::Dict(d)) => Some(d),
        Some(PDFObject::Array(items)) => items.get(index).and_then(|o| o.as_dict().ok()),
        _ => None,
    }
}

/// Run `data` through the stream's filter chain.
pub fn decode_stream(data: &[u8], attrs: &PDFDict) -> Result<Vec<u8>> {
    let mut output = data.to_vec();
    for (index, name) in filter_names(attrs).iter().enumerate() {
        if IMAGE_FILTERS.contains(&name.as_str()) {
            break;
        }
        let parms = decode_parms(attrs, index);
        output = match name.as_str() {
            "FlateDecode" => apply_predictor(flate_decode(&output), parms)?,
            "LZWDecode" => {
                let early = parms.and_then(|p| dict_int(p, "EarlyChange")).unwrap_or(1);
                apply_predictor(lzw_decode(&output, early), parms)?
            }
            "ASCIIHexDecode" => asciihex_decode(&output),
            "ASCII85Decode" => ascii85_decode(&output)?,
            "RunLengthDecode" => runlength_decode(&output),
            "Crypt" => output,
            other => {
                return Err(PdfError::DecodeError(format!("unsupported filter: {other}")));
            }
        };
    }
    Ok(output)
}

/// Zlib decode, returning partial output for corrupted streams.
pub fn flate_decode(data: &[u8]) -> Vec<u8> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    if decoder.read_to_end(&mut out).is_ok() {
        return out;
    }
    decompress_corrupted(data)
}

/// Feed the decoder one byte at a time and keep whatever came out before
/// the failure (typically a bad checksum near the end).
fn decompress_corrupted(data: &[u8]) -> Vec<u8> {
    use flate2::{Decompress, FlushDecompress, Status};
    let mut decoder = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut buf = [0u8; 4096];
    let mut i = 0usize;
    while i < data.len() {
        let before_out = decoder.total_out();
        let before_in = decoder.total_in();
        let res = decoder.decompress(&data[i..i + 1], &mut buf, FlushDecompress::None);
        let produced = (decoder.total_out() - before_out) as usize;
        out.extend_from_slice(&buf[..produced]);
        let consumed = (decoder.total_in() - before_in) as usize;
        i += consumed.max(1);
        match res {
            Ok(Status::StreamEnd) | Err(_) => break,
            Ok(_) => {}
        }
    }
    out
}

/// Zlib encode at the default level.
pub fn flate_encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// LZW decode (MSB first). EarlyChange=0 switches code size late, as TIFF does.
pub fn lzw_decode(data: &[u8], early_change: i64) -> Vec<u8> {
    let mut decoder = if early_change == 0 {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        Decoder::new(BitOrder::Msb, 8)
    };
    let mut output = Vec::new();
    // Corrupt tails are common; keep the decoded prefix.
    let _ = decoder.into_vec(&mut output).decode(data);
    output
}

/// ASCIIHex decode. Whitespace is skipped, `>` ends the data, and an odd
/// trailing digit is padded with 0.
pub fn asciihex_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;
    for &b in data {
        if b == b'>' {
            break;
        }
        let nibble = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => continue,
        };
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    out
}

/// ASCII85 decode (PDF variant). Handles `z`, `<~ ~>` markers and a
/// missing end-of-data marker.
pub fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    let data = data.strip_prefix(b"<~").unwrap_or(data);
    let data = match data.iter().position(|&b| b == b'~') {
        Some(pos) => &data[..pos],
        None => data,
    };

    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut n = 0usize;
    for &b in data {
        match b {
            b' ' | b'\t' | b'\n' | b'\r' | b'\x00' | b'\x0c' => {}
            b'z' if n == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[n] = b - b'!';
                n += 1;
                if n == 5 {
                    out.extend_from_slice(&ascii85_group(&group)?.to_be_bytes());
                    n = 0;
                }
            }
            other => {
                return Err(PdfError::DecodeError(format!(
                    "invalid ASCII85 byte 0x{other:02x}"
                )));
            }
        }
    }
    if n > 1 {
        group[n..].fill(84);
        let word = ascii85_group(&group)?.to_be_bytes();
        out.extend_from_slice(&word[..n - 1]);
    }
    Ok(out)
}

fn ascii85_group(group: &[u8; 5]) -> Result<u32> {
    let value = group
        .iter()
        .fold(0u64, |acc, &digit| acc * 85 + u64::from(digit));
    u32::try_from(value).map_err(|_| PdfError::DecodeError("ASCII85 group overflow".into()))
}

/// RunLength decode. Truncated runs end decoding without error.
pub fn runlength_decode(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            128 => break,
            0..=127 => {
                let count = length as usize + 1;
                if i + count > data.len() {
                    break;
                }
                result.extend_from_slice(&data[i..i + count]);
                i += count;
            }
            129..=255 => {
                let Some(&byte) = data.get(i) else { break };
                i += 1;
                result.extend(std::iter::repeat_n(byte, 257 - length as usize));
            }
        }
    }
    result
}

/// Widest predictor row accepted, in bytes.
const MAX_PREDICTOR_ROW: usize = 1 << 24;

/// Bytes per row and bytes per pixel for the given predictor parameters.
fn predictor_layout(columns: i64, colors: i64, bits: i64) -> Result<(usize, usize)> {
    if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
        return Err(PdfError::DecodeError(format!(
            "predictor BitsPerComponent {bits} not supported"
        )));
    }
    let (Ok(columns), Ok(colors)) = (usize::try_from(columns.max(1)), usize::try_from(colors.max(1)))
    else {
        return Err(PdfError::DecodeError("predictor parameters out of range".into()));
    };
    let bits = bits as usize;
    let row_bytes = columns
        .checked_mul(colors)
        .and_then(|n| n.checked_mul(bits))
        .map(|n| n.div_ceil(8))
        .filter(|&n| n <= MAX_PREDICTOR_ROW)
        .ok_or_else(|| {
            PdfError::DecodeError(format!(
                "predictor row of {columns} columns x {colors} colors too wide"
            ))
        })?;
    let bpp = (colors * bits / 8).max(1);
    Ok((row_bytes, bpp))
}

fn apply_predictor(data: Vec<u8>, parms: Option<&PDFDict>) -> Result<Vec<u8>> {
    let Some(parms) = parms else {
        return Ok(data);
    };
    let predictor = dict_int(parms, "Predictor").unwrap_or(1);
    if predictor == 1 {
        return Ok(data);
    }
    let bits = dict_int(parms, "BitsPerComponent").unwrap_or(8);
    let (row_bytes, bpp) = predictor_layout(
        dict_int(parms, "Columns").unwrap_or(1),
        dict_int(parms, "Colors").unwrap_or(1),
        bits,
    )?;
    match predictor {
        2 => Ok(tiff_predictor(&data, row_bytes, bpp, bits == 8)),
        p if p >= 10 => Ok(png_predictor(&data, row_bytes, bpp)),
        other => Err(PdfError::DecodeError(format!("unsupported predictor {other}"))),
    }
}

/// TIFF predictor 2; only 8-bit components are undone.
fn tiff_predictor(data: &[u8], row_bytes: usize, colors: usize, eight_bit: bool) -> Vec<u8> {
    let mut out = data.to_vec();
    if !eight_bit {
        return out;
    }
    for row in out.chunks_mut(row_bytes) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    out
}

/// Undo PNG row filters (None/Sub/Up/Average/Paeth).
fn png_predictor(data: &[u8], row_bytes: usize, bpp: usize) -> Vec<u8> {
    let row_size = row_bytes + 1;

    let mut result = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];
    let mut current_row = vec![0u8; row_bytes];

    for row in data.chunks_exact(row_size) {
        let filter_type = row[0];
        let row_data = &row[1..];
        for i in 0..row_bytes {
            let left = if i >= bpp { current_row[i - bpp] } else { 0 };
            let above = prev_row[i];
            let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
            let predicted = match filter_type {
                1 => left,
                2 => above,
                3 => ((u16::from(left) + u16::from(above)) / 2) as u8,
                4 => paeth(left, above, upper_left),
                _ => 0,
            };
            current_row[i] = row_data[i].wrapping_add(predicted);
        }
        result.extend_from_slice(&current_row);
        std::mem::swap(&mut prev_row, &mut current_row);
    }
    result
}

const fn paeth(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}
