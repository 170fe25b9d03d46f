//! Graphics and text state, colors and affine geometry.

use crate::document::Document;
use crate::model::objects::{PDFDict, PDFObject, dict_int, dict_num};
use std::collections::HashMap;
use std::sync::Arc;

/// A point in user or device space.
pub type Point = (f64, f64);

/// A 6-element affine transformation matrix (a, b, c, d, e, f).
/// Transforms point (x, y) to (ax + cy + e, bx + dy + f).
pub type Matrix = (f64, f64, f64, f64, f64, f64);

/// Identity transformation matrix.
pub const MATRIX_IDENTITY: Matrix = (1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

/// Multiplies two matrices: result = m1 * m0 (m1 applied first).
pub fn mult_matrix(m1: Matrix, m0: Matrix) -> Matrix {
    let (a1, b1, c1, d1, e1, f1) = m1;
    let (a0, b0, c0, d0, e0, f0) = m0;
    (
        a0 * a1 + c0 * b1,
        b0 * a1 + d0 * b1,
        a0 * c1 + c0 * d1,
        b0 * c1 + d0 * d1,
        a0 * e1 + c0 * f1 + e0,
        b0 * e1 + d0 * f1 + f0,
    )
}

/// Applies a matrix to a point.
pub fn apply_matrix_pt(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a * x + c * y + e, b * x + d * y + f)
}

/// Inverse of `m`, `None` when it is singular.
pub fn invert_matrix(m: Matrix) -> Option<Matrix> {
    let (a, b, c, d, e, f) = m;
    let det = a * d - b * c;
    if det.abs() < 1e-12 {
        return None;
    }
    Some((
        d / det,
        -b / det,
        -c / det,
        a / det,
        (c * f - d * e) / det,
        (b * e - a * f) / det,
    ))
}

/// Matrix from a 6-number PDF array.
pub fn matrix_from_array(obj: &PDFObject) -> Option<Matrix> {
    let nums: Vec<f64> = obj
        .as_array()
        .ok()?
        .iter()
        .map(|v| v.as_num().ok())
        .collect::<Option<_>>()?;
    match nums[..] {
        [a, b, c, d, e, f] => Some((a, b, c, d, e, f)),
        _ => None,
    }
}

/// Axis-aligned rectangle in device pixels, `x0 <= x1`, `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl DeviceRect {
    /// Bounding box of `points`.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut rect = Self {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
        };
        for (x, y) in iter {
            rect.x0 = rect.x0.min(x);
            rect.y0 = rect.y0.min(y);
            rect.x1 = rect.x1.max(x);
            rect.y1 = rect.y1.max(y);
        }
        Some(rect)
    }

    pub fn intersect(self, other: Self) -> Self {
        Self {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1).max(self.x0.max(other.x0)),
            y1: self.y1.min(other.y1).max(self.y0.max(other.y0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }
}

/// Color value in one of the device families.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    /// 0.0 = black, 1.0 = white
    Gray(f64),
    Rgb(f64, f64, f64),
    Cmyk(f64, f64, f64, f64),
}

impl Default for Color {
    fn default() -> Self {
        Self::Gray(0.0)
    }
}

impl Color {
    /// 8-bit RGB, using the naive CMYK conversion.
    pub fn to_rgb(self) -> [u8; 3] {
        let to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        match self {
            Self::Gray(g) => [to_u8(g); 3],
            Self::Rgb(r, g, b) => [to_u8(r), to_u8(g), to_u8(b)],
            Self::Cmyk(c, m, y, k) => [
                to_u8((1.0 - c) * (1.0 - k)),
                to_u8((1.0 - m) * (1.0 - k)),
                to_u8((1.0 - y) * (1.0 - k)),
            ],
        }
    }
}

/// Color space of fill/stroke operators and images.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    /// Palette of `base` colors, `hival + 1` entries.
    Indexed {
        base: Box<ColorSpace>,
        hival: usize,
        lookup: Vec<u8>,
    },
    /// Patterns are painted with a neutral gray.
    Pattern,
}

impl ColorSpace {
    pub fn ncomponents(&self) -> usize {
        match self {
            Self::DeviceGray | Self::Indexed { .. } | Self::Pattern => 1,
            Self::DeviceRgb => 3,
            Self::DeviceCmyk => 4,
        }
    }

    /// Initial color per the color space.
    pub fn initial_color(&self) -> Color {
        match self {
            Self::DeviceCmyk => Color::Cmyk(0.0, 0.0, 0.0, 1.0),
            Self::DeviceRgb => Color::Rgb(0.0, 0.0, 0.0),
            Self::Indexed { .. } => self.color(&[0.0]),
            Self::DeviceGray | Self::Pattern => Color::Gray(0.0),
        }
    }

    /// Build a color from operator operands.
    pub fn color(&self, comps: &[f64]) -> Color {
        let at = |i: usize| comps.get(i).copied().unwrap_or(0.0);
        match self {
            Self::DeviceGray => Color::Gray(at(0)),
            Self::DeviceRgb => Color::Rgb(at(0), at(1), at(2)),
            Self::DeviceCmyk => Color::Cmyk(at(0), at(1), at(2), at(3)),
            Self::Pattern => Color::Gray(0.5),
            Self::Indexed {
                base,
                hival,
                lookup,
            } => {
                let index = (at(0).max(0.0) as usize).min(*hival);
                let n = base.ncomponents();
                let comps: Vec<f64> = (0..n)
                    .map(|i| f64::from(lookup.get(index * n + i).copied().unwrap_or(0)) / 255.0)
                    .collect();
                base.color(&comps)
            }
        }
    }

    /// Resolve a color space operand, looking names up in `/ColorSpace`
    /// resources. Unknown spaces fall back by component count.
    pub fn resolve(doc: &Document, obj: &PDFObject, resources: Option<&PDFDict>) -> Self {
        let obj = doc.resolve(obj);
        match obj {
            PDFObject::Name(name) => match name.as_str() {
                "DeviceGray" | "G" | "CalGray" => Self::DeviceGray,
                "DeviceRGB" | "RGB" | "CalRGB" | "Lab" => Self::DeviceRgb,
                "DeviceCMYK" | "CMYK" => Self::DeviceCmyk,
                "Pattern" => Self::Pattern,
                other => resources
                    .and_then(|r| doc.resolve_key(r, "ColorSpace"))
                    .and_then(|cs| cs.as_dict().ok())
                    .and_then(|cs| cs.get(other))
                    .filter(|named| !matches!(doc.resolve(named), PDFObject::Name(n) if n == other))
                    .map_or(Self::DeviceGray, |named| Self::resolve(doc, named, None)),
            },
            PDFObject::Array(items) => {
                let family = items.first().map(|f| doc.resolve(f));
                match family.and_then(|f| f.as_name().ok()) {
                    Some("ICCBased") => {
                        let n = items
                            .get(1)
                            .map(|s| doc.resolve(s))
                            .and_then(|s| s.as_dict().ok())
                            .and_then(|d| dict_int(d, "N"))
                            .unwrap_or(3);
                        match n {
                            1 => Self::DeviceGray,
                            4 => Self::DeviceCmyk,
                            _ => Self::DeviceRgb,
                        }
                    }
                    Some("Indexed" | "I") if items.len() >= 4 => {
                        let base = Self::resolve(doc, &items[1], resources);
                        let hival = doc.resolve(&items[2]).as_int().unwrap_or(0).clamp(0, 255) as usize;
                        let lookup = match doc.resolve(&items[3]) {
                            PDFObject::String(s) => s.clone(),
                            PDFObject::Stream(s) => s.decode().unwrap_or_default(),
                            _ => Vec::new(),
                        };
                        Self::Indexed {
                            base: Box::new(base),
                            hival,
                            lookup,
                        }
                    }
                    Some("Separation" | "DeviceN") => Self::DeviceGray,
                    Some("Pattern") => Self::Pattern,
                    Some(_) if items.len() == 1 => Self::resolve(doc, &items[0], resources),
                    _ => Self::DeviceRgb,
                }
            }
            _ => Self::DeviceGray,
        }
    }
}

/// Glyph advance widths of a font, in thousandths of text space.
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    /// Composite fonts use 2-byte codes.
    pub two_byte: bool,
    pub widths: HashMap<u32, f64>,
    pub default_width: f64,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            two_byte: false,
            widths: HashMap::new(),
            default_width: 500.0,
        }
    }
}

impl FontMetrics {
    /// Read `/Widths` of a simple font or `/W` of a Type0 descendant.
    pub fn from_font(doc: &Document, font: &PDFDict) -> Self {
        let mut metrics = Self::default();
        if font.get("Subtype").and_then(|s| s.as_name().ok()) == Some("Type0") {
            metrics.two_byte = true;
            metrics.default_width = 1000.0;
            let descendant = doc
                .resolve_key(font, "DescendantFonts")
                .and_then(|d| d.as_array().ok())
                .and_then(|d| d.first())
                .and_then(|d| doc.resolve(d).as_dict().ok());
            if let Some(cid_font) = descendant {
                if let Some(dw) = dict_num(cid_font, "DW") {
                    metrics.default_width = dw;
                }
                if let Some(w) = doc.resolve_key(cid_font, "W").and_then(|w| w.as_array().ok()) {
                    metrics.read_cid_widths(doc, w);
                }
            }
            return metrics;
        }

        let first = doc
            .resolve_key(font, "FirstChar")
            .and_then(|f| f.as_int().ok())
            .unwrap_or(0)
            .max(0) as u32;
        if let Some(widths) = doc.resolve_key(font, "Widths").and_then(|w| w.as_array().ok()) {
            for (i, w) in widths.iter().enumerate() {
                if let Ok(w) = doc.resolve(w).as_num() {
                    metrics.widths.insert(first + i as u32, w);
                }
            }
        }
        metrics
    }

    /// `[c [w1 w2 ...]]` and `[c_first c_last w]` runs.
    fn read_cid_widths(&mut self, doc: &Document, w: &[PDFObject]) {
        let mut i = 0;
        while i < w.len() {
            let Ok(start) = doc.resolve(&w[i]).as_int() else {
                break;
            };
            let start = start.max(0) as u32;
            match w.get(i + 1).map(|o| doc.resolve(o)) {
                Some(PDFObject::Array(run)) => {
                    for (k, width) in run.iter().enumerate() {
                        if let Ok(width) = doc.resolve(width).as_num() {
                            self.widths.insert(start + k as u32, width);
                        }
                    }
                    i += 2;
                }
                Some(end) => {
                    let end = end.as_int().unwrap_or(0).max(0) as u32;
                    let width = w.get(i + 2).and_then(|o| doc.resolve(o).as_num().ok());
                    if let Some(width) = width {
                        for code in start..=end.min(start.saturating_add(0xFFFF)) {
                            self.widths.insert(code, width);
                        }
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    pub fn width(&self, code: u32) -> f64 {
        self.widths.get(&code).copied().unwrap_or(self.default_width)
    }

    /// Split a shown string into character codes.
    pub fn codes(&self, s: &[u8]) -> Vec<u32> {
        if self.two_byte {
            s.chunks(2)
                .map(|c| c.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
                .collect()
        } else {
            s.iter().map(|&b| u32::from(b)).collect()
        }
    }
}

/// Text state, reset at each `BT`.
#[derive(Debug, Clone)]
pub struct TextState {
    /// Font resource name from `Tf`.
    pub fontname: Option<String>,
    pub font: Arc<FontMetrics>,
    pub fontsize: f64,
    pub charspace: f64,
    pub wordspace: f64,
    /// Horizontal scaling percentage (100 = normal)
    pub scaling: f64,
    pub leading: f64,
    /// Text rendering mode (0-7)
    pub render: i64,
    pub rise: f64,
    /// Text matrix (Tm)
    pub matrix: Matrix,
    /// Line matrix (start of the current line)
    pub linematrix: Matrix,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            fontname: None,
            font: Arc::default(),
            fontsize: 0.0,
            charspace: 0.0,
            wordspace: 0.0,
            scaling: 100.0,
            leading: 0.0,
            render: 0,
            rise: 0.0,
            matrix: MATRIX_IDENTITY,
            linematrix: MATRIX_IDENTITY,
        }
    }
}

impl TextState {
    /// Reset text and line matrices (`BT`).
    pub fn reset(&mut self) {
        self.matrix = MATRIX_IDENTITY;
        self.linematrix = MATRIX_IDENTITY;
    }
}

/// Graphics state saved and restored by `q`/`Q`.
#[derive(Debug, Clone)]
pub struct GraphicState {
    /// User space to device pixels.
    pub ctm: Matrix,
    pub linewidth: f64,
    pub linecap: i64,
    pub linejoin: i64,
    pub miterlimit: f64,
    pub dash: (Vec<f64>, f64),
    pub stroke_color: Color,
    pub stroke_space: ColorSpace,
    pub fill_color: Color,
    pub fill_space: ColorSpace,
    /// Constant alpha for stroking (`CA`)
    pub stroke_alpha: f64,
    /// Constant alpha for filling (`ca`)
    pub fill_alpha: f64,
    /// Rectangular clip in device pixels.
    pub clip: DeviceRect,
    pub text: TextState,
}

impl GraphicState {
    pub fn new(ctm: Matrix, clip: DeviceRect) -> Self {
        Self {
            ctm,
            linewidth: 1.0,
            linecap: 0,
            linejoin: 0,
            miterlimit: 10.0,
            dash: (Vec::new(), 0.0),
            stroke_color: Color::default(),
            stroke_space: ColorSpace::DeviceGray,
            fill_color: Color::default(),
            fill_space: ColorSpace::DeviceGray,
            stroke_alpha: 1.0,
            fill_alpha: 1.0,
            clip,
            text: TextState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_inverse_roundtrip() {
        let m = (2.0, 0.0, 0.0, -2.0, 10.0, 400.0);
        let inv = invert_matrix(m).unwrap();
        let p = apply_matrix_pt(m, (3.0, 7.0));
        let back = apply_matrix_pt(inv, p);
        assert!((back.0 - 3.0).abs() < 1e-9 && (back.1 - 7.0).abs() < 1e-9);
        assert!(invert_matrix((0.0, 0.0, 0.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn mult_applies_left_first() {
        let scale = (2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = (1.0, 0.0, 0.0, 1.0, 5.0, 0.0);
        assert_eq!(apply_matrix_pt(mult_matrix(scale, shift), (1.0, 1.0)), (7.0, 2.0));
    }

    #[test]
    fn cmyk_and_indexed_colors() {
        assert_eq!(Color::Cmyk(0.0, 0.0, 0.0, 1.0).to_rgb(), [0, 0, 0]);
        assert_eq!(Color::Cmyk(1.0, 0.0, 0.0, 0.0).to_rgb(), [0, 255, 255]);
        let palette = ColorSpace::Indexed {
            base: Box::new(ColorSpace::DeviceRgb),
            hival: 1,
            lookup: vec![255, 0, 0, 0, 0, 255],
        };
        assert_eq!(palette.color(&[1.0]).to_rgb(), [0, 0, 255]);
        assert_eq!(palette.color(&[9.0]).to_rgb(), [0, 0, 255]);
    }

    #[test]
    fn font_widths_simple_and_composite() {
        let doc = Document::new();
        let simple = PDFDict::from([
            ("FirstChar".to_string(), PDFObject::Int(65)),
            ("Widths".to_string(), PDFObject::number_array(&[600.0, 700.0])),
        ]);
        let metrics = FontMetrics::from_font(&doc, &simple);
        assert_eq!(metrics.width(66), 700.0);
        assert_eq!(metrics.width(10), 500.0);
        assert_eq!(metrics.codes(b"AB"), vec![65, 66]);

        let cid = PDFDict::from([
            ("DW".to_string(), PDFObject::Int(900)),
            (
                "W".to_string(),
                PDFObject::Array(vec![
                    PDFObject::Int(1),
                    PDFObject::number_array(&[250.0, 260.0]),
                    PDFObject::Int(10),
                    PDFObject::Int(12),
                    PDFObject::Int(333),
                ]),
            ),
        ]);
        let composite = PDFDict::from([
            ("Subtype".to_string(), PDFObject::name("Type0")),
            ("DescendantFonts".to_string(), PDFObject::Array(vec![PDFObject::Dict(cid)])),
        ]);
        let metrics = FontMetrics::from_font(&doc, &composite);
        assert!(metrics.two_byte);
        assert_eq!(metrics.codes(&[0, 2, 0, 11]), vec![2, 11]);
        assert_eq!(metrics.width(2), 260.0);
        assert_eq!(metrics.width(11), 333.0);
        assert_eq!(metrics.width(99), 900.0);
    }

    #[test]
    fn rect_intersection_can_be_empty() {
        let a = DeviceRect { x0: 0.0, y0: 0.0, x1: 10.0, y1: 10.0 };
        let b = DeviceRect { x0: 20.0, y0: 20.0, x1: 30.0, y1: 30.0 };
        assert!(a.intersect(b).is_empty());
        assert!(!a.intersect(a).is_empty());
    }
}
