//! Page rasterization.
//!
//! - `state`: graphics/text state, colors, matrices
//! - `device`: the [`Device`] trait and the pixel-buffer device
//! - `canvas`: scanline rasterizer
//! - `interpreter` and `ops`: content stream interpretation
//! - `image`: image XObject decoding, sampling and JPEG encoding

pub mod canvas;
pub mod device;
pub mod image;
pub mod interpreter;
mod ops;
pub mod state;

pub use device::{Device, PathSegment, RasterDevice};
pub use self::image::{decode_image, downscale, encode_jpeg, load_image, sample_factor, target_size};
pub use interpreter::PageInterpreter;

use crate::document::{Document, Page};
use crate::{PdfError, Result};
use ::image::DynamicImage;
use state::Matrix;
use std::str::FromStr;
use tracing::debug;

/// Rendered pages above this many pixels are refused.
const MAX_RENDER_PIXELS: f64 = 100_000_000.0;

/// Output size and quality preset. Always chosen explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompressionLevel {
    Low,
    Medium,
    High,
}

impl CompressionLevel {
    /// Render resolution in dots per inch.
    pub const fn dpi(self) -> f64 {
        match self {
            Self::Low => 72.0,
            Self::Medium => 150.0,
            Self::High => 300.0,
        }
    }

    /// JPEG quality, 1-100.
    pub const fn jpeg_quality(self) -> u8 {
        match self {
            Self::Low => 60,
            Self::Medium => 80,
            Self::High => 95,
        }
    }

    /// Largest output width and height in pixels.
    pub const fn max_dimensions(self) -> (u32, u32) {
        match self {
            Self::Low => (800, 1200),
            Self::Medium => (1200, 1800),
            Self::High => (2480, 3508),
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = PdfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(PdfError::InvalidArgument(format!(
                "unknown compression level {other:?}"
            ))),
        }
    }
}

/// Pixel format of rendered pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorMode {
    Gray,
    #[default]
    Rgb,
}

/// Options for [`render`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub dpi: f64,
    pub color_mode: ColorMode,
    /// Downscale the result to fit (width, height).
    pub max_size: Option<(u32, u32)>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dpi: 150.0,
            color_mode: ColorMode::Rgb,
            max_size: None,
        }
    }
}

impl From<CompressionLevel> for RenderOptions {
    fn from(level: CompressionLevel) -> Self {
        Self {
            dpi: level.dpi(),
            color_mode: ColorMode::Rgb,
            max_size: Some(level.max_dimensions()),
        }
    }
}

/// A content operator that could not be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RenderError {
    /// 1-based page number.
    pub page: usize,
    pub operator: String,
    pub message: String,
}

/// Result of rendering one page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-based page number.
    pub page: usize,
    pub image: DynamicImage,
    pub issues: Vec<RenderError>,
}

/// Map the page's visible box to device pixels, honoring `/Rotate`.
pub fn page_matrix(page: &Page, scale: f64) -> Matrix {
    let [x0, y0, x1, y1] = page.visible_box();
    let s = scale;
    match page.rotate {
        90 => (0.0, s, s, 0.0, -y0 * s, -x0 * s),
        180 => (-s, 0.0, 0.0, s, x1 * s, -y0 * s),
        270 => (0.0, -s, -s, 0.0, y1 * s, x1 * s),
        _ => (s, 0.0, 0.0, -s, -x0 * s, y1 * s),
    }
}

/// Render `page` to a pixel buffer.
///
/// Content problems are collected in [`RenderedPage::issues`]; only an
/// unusable page size is an error.
pub fn render(doc: &Document, page: &Page, options: &RenderOptions) -> Result<RenderedPage> {
    let number = page.index + 1;
    if !(options.dpi.is_finite() && options.dpi > 0.0) {
        return Err(PdfError::InvalidArgument(format!("invalid dpi {}", options.dpi)));
    }
    let scale = options.dpi / 72.0;
    let (w_pt, h_pt) = page.size();
    let (width, height) = ((w_pt * scale).round().max(1.0), (h_pt * scale).round().max(1.0));
    if !(width * height).is_finite() || width * height > MAX_RENDER_PIXELS {
        return Err(PdfError::Render {
            page: number,
            msg: format!("page too large to render ({width}x{height} pixels)"),
        });
    }

    let mut device = RasterDevice::new(width as u32, height as u32);
    let clip = device.canvas().bounds();
    let mut interp = PageInterpreter::new(doc, &mut device, number, page_matrix(page, scale), clip);
    interp.process_page(page);
    let issues = interp.finish();

    let rgb = DynamicImage::ImageRgb8(device.into_canvas().into_image());
    let mut image = match options.color_mode {
        ColorMode::Rgb => rgb,
        ColorMode::Gray => DynamicImage::ImageLuma8(rgb.to_luma8()),
    };
    if let Some((max_w, max_h)) = options.max_size {
        image = downscale(&image, max_w, max_h);
    }
    debug!(
        page = number,
        width = image.width(),
        height = image.height(),
        issues = issues.len(),
        "page rendered"
    );
    Ok(RenderedPage {
        page: number,
        image,
        issues,
    })
}
