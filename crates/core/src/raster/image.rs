//! Image decoding, sampling and encoding.
//!
//! Two halves: decoding image XObjects into RGBA for the page interpreter,
//! and sizing helpers for image files fed to the compositor.

use super::CompressionLevel;
use super::state::{Color, ColorSpace};
use crate::codec::filters::image_filter;
use crate::document::Document;
use crate::model::objects::{PDFDict, PDFObject, PDFStream};
use crate::{PdfError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, RgbImage, Rgba, RgbaImage};
use jpeg_decoder::PixelFormat;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// Decoded images larger than this many pixels are refused.
const MAX_IMAGE_PIXELS: u64 = 64 * 1024 * 1024;

/// Inline image keys and their full names.
const INLINE_KEYS: [(&str, &str); 9] = [
    ("W", "Width"),
    ("H", "Height"),
    ("BPC", "BitsPerComponent"),
    ("CS", "ColorSpace"),
    ("IM", "ImageMask"),
    ("F", "Filter"),
    ("DP", "DecodeParms"),
    ("D", "Decode"),
    ("I", "Interpolate"),
];

/// Expand inline image abbreviations (`W`, `BPC`, ...) to full keys.
pub fn expand_inline_attrs(attrs: &PDFDict) -> PDFDict {
    attrs
        .iter()
        .map(|(key, value)| {
            let key = INLINE_KEYS
                .iter()
                .find(|(short, _)| short == key)
                .map_or(key.as_str(), |(_, long)| long);
            (key.to_string(), value.clone())
        })
        .collect()
}

/// Decode an image XObject into RGBA.
///
/// Stencil masks (`/ImageMask true`) paint `fill` where the mask selects
/// and are transparent elsewhere. `/SMask` becomes the alpha channel.
pub fn decode_image(
    doc: &Document,
    stream: &PDFStream,
    resources: Option<&PDFDict>,
    fill: Color,
) -> Result<RgbaImage> {
    let attrs = &stream.attrs;
    let int = |key: &str| doc.resolve_key(attrs, key).and_then(|v| v.as_int().ok());
    let (Some(width), Some(height)) = (int("Width"), int("Height")) else {
        return Err(PdfError::DecodeError("image without dimensions".into()));
    };
    if width <= 0 || height <= 0 || (width as u64) * (height as u64) > MAX_IMAGE_PIXELS {
        return Err(PdfError::DecodeError(format!(
            "unsupported image size {width}x{height}"
        )));
    }
    let (width, height) = (width as u32, height as u32);

    let mut image = match image_filter(attrs).as_deref() {
        Some("DCTDecode") => {
            let data = stream.decode()?;
            image::load_from_memory_with_format(&data, ImageFormat::Jpeg)?.to_rgba8()
        }
        Some(codec) => {
            return Err(PdfError::DecodeError(format!(
                "unsupported image codec {codec}"
            )));
        }
        None => {
            let data = stream.decode()?;
            let is_mask = doc
                .resolve_key(attrs, "ImageMask")
                .and_then(|m| m.as_bool().ok())
                .unwrap_or(false);
            if is_mask {
                decode_stencil(doc, attrs, &data, width, height, fill)
            } else {
                decode_samples(doc, attrs, &data, width, height, resources)?
            }
        }
    };

    if let Some(PDFObject::Stream(smask)) = attrs.get("SMask").map(|s| doc.resolve(s)) {
        match decode_image(doc, smask, None, Color::Gray(0.0)) {
            Ok(mask) => apply_soft_mask(&mut image, &mask),
            Err(e) => warn!(error = %e, "ignoring undecodable soft mask"),
        }
    }
    Ok(image)
}

/// Reads `bpc`-bit samples from packed rows.
struct SampleReader<'a> {
    data: &'a [u8],
    bpc: u32,
    row_bytes: usize,
}

impl SampleReader<'_> {
    /// Sample `index` of `row`; missing data reads as 0.
    fn get(&self, row: usize, index: usize) -> u32 {
        let base = row * self.row_bytes;
        match self.bpc {
            8 => self.data.get(base + index).map_or(0, |&b| u32::from(b)),
            16 => {
                let hi = self.data.get(base + index * 2).copied().unwrap_or(0);
                let lo = self.data.get(base + index * 2 + 1).copied().unwrap_or(0);
                (u32::from(hi) << 8) | u32::from(lo)
            }
            bpc => {
                let bit = index * bpc as usize;
                let byte = self.data.get(base + bit / 8).copied().unwrap_or(0);
                let shift = 8 - bpc as usize - bit % 8;
                (u32::from(byte) >> shift) & ((1 << bpc) - 1)
            }
        }
    }
}

fn decode_array(doc: &Document, attrs: &PDFDict) -> Option<Vec<f64>> {
    doc.resolve_key(attrs, "Decode")?
        .as_array()
        .ok()?
        .iter()
        .map(|v| doc.resolve(v).as_num().ok())
        .collect()
}

fn decode_stencil(
    doc: &Document,
    attrs: &PDFDict,
    data: &[u8],
    width: u32,
    height: u32,
    fill: Color,
) -> RgbaImage {
    let inverted = decode_array(doc, attrs).is_some_and(|d| d.first() == Some(&1.0));
    let reader = SampleReader {
        data,
        bpc: 1,
        row_bytes: (width as usize).div_ceil(8),
    };
    let [r, g, b] = fill.to_rgb();
    RgbaImage::from_fn(width, height, |x, y| {
        let bit = reader.get(y as usize, x as usize);
        let paint = (bit == 0) != inverted;
        Rgba([r, g, b, if paint { 255 } else { 0 }])
    })
}

fn decode_samples(
    doc: &Document,
    attrs: &PDFDict,
    data: &[u8],
    width: u32,
    height: u32,
    resources: Option<&PDFDict>,
) -> Result<RgbaImage> {
    let bpc = doc
        .resolve_key(attrs, "BitsPerComponent")
        .and_then(|b| b.as_int().ok())
        .unwrap_or(8);
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(PdfError::DecodeError(format!(
            "unsupported bits per component {bpc}"
        )));
    }
    let bpc = bpc as u32;
    let space = attrs
        .get("ColorSpace")
        .map_or(ColorSpace::DeviceGray, |cs| ColorSpace::resolve(doc, cs, resources));
    let ncomp = space.ncomponents();
    let row_bytes = (width as usize * ncomp * bpc as usize).div_ceil(8);
    let expected = row_bytes * height as usize;
    if data.len() < expected {
        debug!(
            expected,
            actual = data.len(),
            "short image data, padding with zeros"
        );
    }

    let max = f64::from((1u32 << bpc) - 1);
    let decode = decode_array(doc, attrs).filter(|d| d.len() >= ncomp * 2);
    let reader = SampleReader {
        data,
        bpc,
        row_bytes,
    };
    let palette: Option<Vec<[u8; 3]>> = match &space {
        ColorSpace::Indexed { hival, .. } => Some(
            (0..=*hival)
                .map(|i| space.color(&[i as f64]).to_rgb())
                .collect(),
        ),
        _ => None,
    };

    let mut comps = vec![0.0; ncomp];
    let mut image = RgbaImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let first = x as usize * ncomp;
        let rgb = match &palette {
            Some(palette) => {
                let index = reader.get(y as usize, first) as usize;
                palette[index.min(palette.len() - 1)]
            }
            None => {
                for (i, comp) in comps.iter_mut().enumerate() {
                    let raw = f64::from(reader.get(y as usize, first + i)) / max;
                    *comp = match &decode {
                        Some(d) => d[2 * i] + raw * (d[2 * i + 1] - d[2 * i]),
                        None => raw,
                    };
                }
                space.color(&comps).to_rgb()
            }
        };
        *pixel = Rgba([rgb[0], rgb[1], rgb[2], 255]);
    }
    Ok(image)
}

/// Multiply the alpha channel by the mask's luminance.
fn apply_soft_mask(image: &mut RgbaImage, mask: &RgbaImage) {
    let mask = if mask.dimensions() == image.dimensions() {
        mask.clone()
    } else {
        image::imageops::resize(mask, image.width(), image.height(), FilterType::Triangle)
    };
    for (pixel, m) in image.pixels_mut().zip(mask.pixels()) {
        pixel.0[3] = ((u16::from(pixel.0[3]) * u16::from(m.0[0])) / 255) as u8;
    }
}

/// Largest power of two by which a `src_w` x `src_h` image can be
/// subsampled while staying at least `req_w` x `req_h`. Zero requests are
/// treated as one pixel.
pub fn sample_factor(src_w: u32, src_h: u32, req_w: u32, req_h: u32) -> u32 {
    let (req_w, req_h) = (req_w.max(1), req_h.max(1));
    let mut factor = 1;
    if src_h > req_h || src_w > req_w {
        let half_h = src_h / 2;
        let half_w = src_w / 2;
        while half_h / factor >= req_h && half_w / factor >= req_w {
            factor *= 2;
        }
    }
    factor
}

/// Output size for an image under `max_w` x `max_h`, truncating.
///
/// Landscape images clamp their width and derive the height from the
/// aspect ratio; portrait (and square) images clamp the height. The result
/// is then clamped into the box on both axes.
pub fn target_size(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width.max(1), height.max(1));
    }
    let scale = |v: u32, num: u32, den: u32| (u64::from(v) * u64::from(num) / u64::from(den)) as u32;
    let (mut w, mut h) = if width > height {
        let w = max_w.min(width);
        (w, scale(height, w, width))
    } else {
        let h = max_h.min(height);
        (scale(width, h, height), h)
    };
    if h > max_h {
        w = scale(w, max_h, h);
        h = max_h;
    }
    if w > max_w {
        h = scale(h, max_w, w);
        w = max_w;
    }
    (w.max(1), h.max(1))
}

/// Shrink `image` to fit `max_width` x `max_height`, keeping the aspect
/// ratio. Images already inside the box are returned unchanged.
pub fn downscale(image: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if image.width() <= max_width && image.height() <= max_height {
        return image.clone();
    }
    let (w, h) = target_size(image.width(), image.height(), max_width, max_height);
    image.resize_exact(w, h, FilterType::Triangle)
}

/// Load an image file sized for `level`.
///
/// The header is read first to plan the output size. JPEG files that can be
/// subsampled are decoded at a reduced DCT scale (down to 1/8), so the
/// full-resolution buffer never exists; other formats decode under
/// [`MAX_IMAGE_PIXELS`]. The result is then resized to the exact target.
pub fn load_image(path: &Path, level: CompressionLevel) -> Result<DynamicImage> {
    let (max_w, max_h) = level.max_dimensions();
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let (src_w, src_h) = reader.into_dimensions()?;
    let (target_w, target_h) = target_size(src_w, src_h, max_w, max_h);
    let factor = sample_factor(src_w, src_h, target_w, target_h);

    let mut image = match format {
        Some(ImageFormat::Jpeg) if factor > 1 => decode_jpeg_scaled(path, target_w, target_h)?,
        _ => decode_limited(path, src_w, src_h)?,
    };
    let (decoded_w, decoded_h) = (image.width(), image.height());
    if (decoded_w, decoded_h) != (target_w, target_h) {
        image = image.resize_exact(target_w, target_h, FilterType::Triangle);
    }
    debug!(
        path = %path.display(),
        src_w, src_h, factor, decoded_w, decoded_h, target_w, target_h,
        "image loaded"
    );
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

fn decode_limited(path: &Path, width: u32, height: u32) -> Result<DynamicImage> {
    if u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS {
        return Err(PdfError::DecodeError(format!(
            "image {width}x{height} is too large to decode"
        )));
    }
    let mut reader = ImageReader::open(path)?.with_guessed_format()?;
    let mut limits = image::Limits::default();
    limits.max_alloc = Some(MAX_IMAGE_PIXELS * 4);
    reader.limits(limits);
    Ok(reader.decode()?)
}

/// Decode a JPEG with DCT scaling so the output is the smallest 1/1, 1/2,
/// 1/4 or 1/8 reduction still covering `req_w` x `req_h`.
fn decode_jpeg_scaled(path: &Path, req_w: u32, req_h: u32) -> Result<DynamicImage> {
    let jpeg_error = |e: jpeg_decoder::Error| PdfError::DecodeError(format!("JPEG: {e}"));
    let clamp = |v: u32| u16::try_from(v).unwrap_or(u16::MAX);

    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(File::open(path)?));
    decoder.read_info().map_err(jpeg_error)?;
    let (w, h) = decoder.scale(clamp(req_w), clamp(req_h)).map_err(jpeg_error)?;
    let pixels = decoder.decode().map_err(jpeg_error)?;
    let (w, h) = (u32::from(w), u32::from(h));

    let image = match decoder.info().map(|info| info.pixel_format) {
        Some(PixelFormat::L8) => GrayImage::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
        Some(PixelFormat::L16) => {
            // Big-endian samples; keep the high byte.
            let gray = pixels.chunks_exact(2).map(|p| p[0]).collect();
            GrayImage::from_raw(w, h, gray).map(DynamicImage::ImageLuma8)
        }
        Some(PixelFormat::RGB24) => RgbImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
        Some(PixelFormat::CMYK32) => {
            let rgb = pixels
                .chunks_exact(4)
                .flat_map(|p| {
                    let k = 255 - u16::from(p[3]);
                    [0, 1, 2].map(|i| ((255 - u16::from(p[i])) * k / 255) as u8)
                })
                .collect();
            RgbImage::from_raw(w, h, rgb).map(DynamicImage::ImageRgb8)
        }
        _ => None,
    };
    image.ok_or_else(|| PdfError::DecodeError("JPEG samples do not match the frame size".into()))
}

/// Baseline JPEG at `quality` (1-100).
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        match image {
            DynamicImage::ImageLuma8(gray) => encoder.encode_image(gray)?,
            other => encoder.encode_image(&other.to_rgb8())?,
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_factor_halves_while_large_enough() {
        assert_eq!(sample_factor(4000, 3000, 1000, 750), 4);
        assert_eq!(sample_factor(4000, 3000, 1001, 750), 2);
        assert_eq!(sample_factor(800, 600, 800, 600), 1);
        assert_eq!(sample_factor(100, 100, 400, 400), 1);
        assert_eq!(sample_factor(64, 64, 0, 0), 64);
        assert_eq!(sample_factor(0, 0, 0, 0), 1);
    }

    #[test]
    fn large_jpeg_is_decoded_at_reduced_scale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        let photo = DynamicImage::ImageRgb8(RgbImage::from_pixel(1600, 1200, image::Rgb([200, 40, 40])));
        std::fs::write(&path, encode_jpeg(&photo, 90).unwrap()).unwrap();

        let eighth = decode_jpeg_scaled(&path, 200, 150).unwrap();
        assert_eq!((eighth.width(), eighth.height()), (200, 150));
        let [r, g, b] = eighth.to_rgb8().get_pixel(100, 75).0;
        assert!(r > 180 && g < 70 && b < 70);

        let low = load_image(&path, CompressionLevel::Low).unwrap();
        assert_eq!((low.width(), low.height()), (800, 600));
    }

    #[test]
    fn oversized_images_are_refused_before_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.png");
        // 20000x20000 RGB header with a token IDAT.
        let png = b"\x89\x50\x4e\x47\x0d\x0a\x1a\x0a\x00\x00\x00\x0d\x49\x48\x44\x52\x00\x00\x4e\x20\x00\x00\x4e\x20\x08\x02\x00\x00\x00\x6c\x12\xd1\x6e\x00\x00\x00\x0b\x49\x44\x41\x54\x78\x9c\x63\x60\x40\x05\x00\x00\x10\x00\x01\x39\xbd\x8f\x65\x00\x00\x00\x00\x49\x45\x4e\x44\xae\x42\x60\x82";
        std::fs::write(&path, png).unwrap();
        assert!(decode_limited(&path, 20000, 20000).is_err());
        assert!(load_image(&path, CompressionLevel::High).is_err());
    }

    #[test]
    fn target_size_landscape_and_portrait() {
        assert_eq!(target_size(4000, 2000, 800, 1200), (800, 400));
        assert_eq!(target_size(1000, 3000, 800, 1200), (400, 1200));
        assert_eq!(target_size(500, 600, 800, 1200), (500, 600));
        // Landscape whose derived height still overflows gets clamped.
        assert_eq!(target_size(1000, 999, 800, 100), (100, 100));
    }

    #[test]
    fn downscale_never_upscales() {
        let small = DynamicImage::ImageRgb8(RgbImage::new(50, 40));
        let same = downscale(&small, 800, 1200);
        assert_eq!((same.width(), same.height()), (50, 40));
        let big = DynamicImage::ImageRgb8(RgbImage::new(1600, 800));
        let out = downscale(&big, 800, 1200);
        assert_eq!((out.width(), out.height()), (800, 400));
    }

    #[test]
    fn inline_keys_are_expanded() {
        let attrs = PDFDict::from([
            ("W".to_string(), PDFObject::Int(2)),
            ("CS".to_string(), PDFObject::name("G")),
            ("Foo".to_string(), PDFObject::Int(1)),
        ]);
        let full = expand_inline_attrs(&attrs);
        assert!(full.contains_key("Width"));
        assert!(full.contains_key("ColorSpace"));
        assert!(full.contains_key("Foo"));
    }

    #[test]
    fn raw_gray_and_indexed_samples() {
        let doc = Document::new();
        let gray = PDFStream::new(
            PDFDict::from([
                ("Width".to_string(), PDFObject::Int(2)),
                ("Height".to_string(), PDFObject::Int(1)),
                ("ColorSpace".to_string(), PDFObject::name("DeviceGray")),
                ("BitsPerComponent".to_string(), PDFObject::Int(8)),
            ]),
            vec![0u8, 255],
        );
        let img = decode_image(&doc, &gray, None, Color::default()).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 255, 255, 255]);

        let indexed = PDFStream::new(
            PDFDict::from([
                ("Width".to_string(), PDFObject::Int(2)),
                ("Height".to_string(), PDFObject::Int(1)),
                (
                    "ColorSpace".to_string(),
                    PDFObject::Array(vec![
                        PDFObject::name("Indexed"),
                        PDFObject::name("DeviceRGB"),
                        PDFObject::Int(1),
                        PDFObject::String(vec![255, 0, 0, 0, 255, 0]),
                    ]),
                ),
                ("BitsPerComponent".to_string(), PDFObject::Int(1)),
            ]),
            vec![0b0100_0000u8],
        );
        let img = decode_image(&doc, &indexed, None, Color::default()).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 255, 0, 255]);
    }

    #[test]
    fn stencil_mask_paints_fill_color() {
        let doc = Document::new();
        let mask = PDFStream::new(
            PDFDict::from([
                ("Width".to_string(), PDFObject::Int(2)),
                ("Height".to_string(), PDFObject::Int(1)),
                ("ImageMask".to_string(), PDFObject::Bool(true)),
            ]),
            vec![0b0100_0000u8],
        );
        let img = decode_image(&doc, &mask, None, Color::Rgb(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0[3], 0);
    }

    #[test]
    fn unsupported_codec_is_an_error() {
        let doc = Document::new();
        let jpx = PDFStream::new(
            PDFDict::from([
                ("Width".to_string(), PDFObject::Int(1)),
                ("Height".to_string(), PDFObject::Int(1)),
                ("Filter".to_string(), PDFObject::name("JPXDecode")),
            ]),
            vec![0u8],
        );
        assert!(matches!(
            decode_image(&doc, &jpx, None, Color::default()),
            Err(PdfError::DecodeError(_))
        ));
    }

    #[test]
    fn jpeg_roundtrip_keeps_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, image::Rgb([10, 200, 30])));
        let bytes = encode_jpeg(&img, 80).unwrap();
        let back = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((back.width(), back.height()), (16, 8));
    }
}
