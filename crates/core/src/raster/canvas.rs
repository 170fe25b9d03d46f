//! Scanline rasterizer over an RGB pixel buffer.
//!
//! One sample per pixel center; no anti-aliasing. Coordinates are device
//! pixels with the origin at the top-left corner.

use super::state::{DeviceRect, Matrix, Point, apply_matrix_pt, invert_matrix};
use image::{Rgb, RgbImage, RgbaImage};

/// Strokes thinner than this many pixels are widened so they stay visible.
const MIN_STROKE_WIDTH: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    /// +1 for downward edges, -1 for upward ones.
    winding: i32,
}

/// Pixel buffer with a white background.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// The whole canvas as a clip rectangle.
    pub fn bounds(&self) -> DeviceRect {
        DeviceRect {
            x0: 0.0,
            y0: 0.0,
            x1: f64::from(self.width()),
            y1: f64::from(self.height()),
        }
    }

    pub fn into_image(self) -> RgbImage {
        self.pixels
    }

    fn blend(&mut self, x: u32, y: u32, color: [u8; 3], alpha: f64) {
        let pixel = self.pixels.get_pixel_mut(x, y);
        if alpha >= 1.0 {
            pixel.0 = color;
            return;
        }
        for (dst, src) in pixel.0.iter_mut().zip(color) {
            let mixed = f64::from(*dst) * (1.0 - alpha) + f64::from(src) * alpha;
            *dst = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Fill closed polygons with the nonzero or even-odd rule.
    pub fn fill_polygons(
        &mut self,
        polygons: &[Vec<Point>],
        even_odd: bool,
        color: [u8; 3],
        alpha: f64,
        clip: DeviceRect,
    ) {
        if alpha <= 0.0 {
            return;
        }
        let mut edges = Vec::new();
        for poly in polygons.iter().filter(|p| p.len() >= 3) {
            for (i, &(x0, y0)) in poly.iter().enumerate() {
                let (x1, y1) = poly[(i + 1) % poly.len()];
                if y0 == y1 || !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
                    continue;
                }
                edges.push(Edge {
                    x0,
                    y0,
                    x1,
                    y1,
                    winding: if y1 > y0 { 1 } else { -1 },
                });
            }
        }
        let Some(bbox) = DeviceRect::bounding(polygons.iter().flatten().copied()) else {
            return;
        };
        let area = bbox.intersect(clip).intersect(self.bounds());
        if area.is_empty() || edges.is_empty() {
            return;
        }

        let row_start = (area.y0 - 0.5).ceil().max(0.0) as u32;
        let row_end = (area.y1 - 0.5).ceil().max(0.0) as u32;
        let mut crossings: Vec<(f64, i32)> = Vec::new();
        for row in row_start..row_end.min(self.height()) {
            let yc = f64::from(row) + 0.5;
            crossings.clear();
            for e in &edges {
                let (top, bottom) = if e.y0 < e.y1 { (e.y0, e.y1) } else { (e.y1, e.y0) };
                if yc < top || yc >= bottom {
                    continue;
                }
                let x = e.x0 + (yc - e.y0) * (e.x1 - e.x0) / (e.y1 - e.y0);
                crossings.push((x, e.winding));
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                let (xa, w) = pair[0];
                winding += w;
                let inside = if even_odd { winding % 2 != 0 } else { winding != 0 };
                if !inside {
                    continue;
                }
                let xb = pair[1].0.min(area.x1);
                let xa = xa.max(area.x0);
                let col_start = (xa - 0.5).ceil().max(0.0) as u32;
                let col_end = ((xb - 0.5).ceil().max(0.0) as u32).min(self.width());
                for col in col_start..col_end {
                    self.blend(col, row, color, alpha);
                }
            }
        }
    }

    /// Stroke open or closed polylines as unions of segment quads with
    /// square joins.
    pub fn stroke_polylines(
        &mut self,
        polylines: &[(Vec<Point>, bool)],
        width: f64,
        color: [u8; 3],
        alpha: f64,
        clip: DeviceRect,
    ) {
        let half = width.max(MIN_STROKE_WIDTH) / 2.0;
        let mut quads = Vec::new();
        for (points, closed) in polylines {
            let mut segments: Vec<(Point, Point)> = points.windows(2).map(|w| (w[0], w[1])).collect();
            if *closed
                && let (Some(&first), Some(&last)) = (points.first(), points.last())
                && first != last
            {
                segments.push((last, first));
            }
            for ((x0, y0), (x1, y1)) in segments {
                let len = (x1 - x0).hypot(y1 - y0);
                if len < 1e-9 {
                    continue;
                }
                let (nx, ny) = (-(y1 - y0) / len * half, (x1 - x0) / len * half);
                quads.push(vec![
                    (x0 + nx, y0 + ny),
                    (x1 + nx, y1 + ny),
                    (x1 - nx, y1 - ny),
                    (x0 - nx, y0 - ny),
                ]);
            }
            for &(x, y) in points {
                quads.push(vec![
                    (x - half, y - half),
                    (x - half, y + half),
                    (x + half, y + half),
                    (x + half, y - half),
                ]);
            }
        }
        // Quads share one orientation, so nonzero gives their union.
        self.fill_polygons(&quads, false, color, alpha, clip);
    }

    /// Draw `image` into the unit square mapped by `to_device`.
    ///
    /// Image row 0 is the top of the unit square (v = 1), nearest-neighbor
    /// sampled by inverse mapping each covered pixel center.
    pub fn draw_image(&mut self, image: &RgbaImage, to_device: Matrix, alpha: f64, clip: DeviceRect) {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 || alpha <= 0.0 {
            return;
        }
        let Some(inverse) = invert_matrix(to_device) else {
            return;
        };
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)].map(|p| apply_matrix_pt(to_device, p));
        let Some(bbox) = DeviceRect::bounding(corners) else {
            return;
        };
        let area = bbox.intersect(clip).intersect(self.bounds());
        if area.is_empty() {
            return;
        }
        let rows = (area.y0.floor() as u32)..(area.y1.ceil() as u32).min(self.height());
        let cols = (area.x0.floor() as u32)..(area.x1.ceil() as u32).min(self.width());
        for row in rows {
            for col in cols.clone() {
                let (u, v) = apply_matrix_pt(inverse, (f64::from(col) + 0.5, f64::from(row) + 0.5));
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                let sx = ((u * f64::from(w)) as u32).min(w - 1);
                let sy = (((1.0 - v) * f64::from(h)) as u32).min(h - 1);
                let [r, g, b, a] = image.get_pixel(sx, sy).0;
                if a > 0 {
                    self.blend(col, row, [r, g, b], alpha * f64::from(a) / 255.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
    }

    #[test]
    fn fills_rectangle_inside_clip() {
        let mut canvas = Canvas::new(10, 10);
        let clip = DeviceRect { x0: 0.0, y0: 0.0, x1: 5.0, y1: 10.0 };
        canvas.fill_polygons(&[square(2.0, 2.0, 8.0, 8.0)], false, [0, 0, 0], 1.0, clip);
        let img = canvas.into_image();
        assert_eq!(img.get_pixel(3, 3).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(6, 3).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(1, 1).0, [255, 255, 255]);
    }

    #[test]
    fn even_odd_leaves_hole() {
        let polys = [square(0.0, 0.0, 10.0, 10.0), square(3.0, 3.0, 7.0, 7.0)];
        let mut canvas = Canvas::new(10, 10);
        let clip = canvas.bounds();
        canvas.fill_polygons(&polys, true, [0, 0, 0], 1.0, clip);
        let img = canvas.into_image();
        assert_eq!(img.get_pixel(5, 5).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(1, 5).0, [0, 0, 0]);

        let mut canvas = Canvas::new(10, 10);
        canvas.fill_polygons(&polys, false, [0, 0, 0], 1.0, clip);
        assert_eq!(canvas.into_image().get_pixel(5, 5).0, [0, 0, 0]);
    }

    #[test]
    fn hairline_stroke_is_visible() {
        let mut canvas = Canvas::new(10, 10);
        let clip = canvas.bounds();
        canvas.stroke_polylines(&[(vec![(0.0, 5.0), (10.0, 5.0)], false)], 0.1, [255, 0, 0], 1.0, clip);
        let img = canvas.into_image();
        assert_eq!(img.get_pixel(4, 4).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(4, 1).0, [255, 255, 255]);
    }

    #[test]
    fn image_is_flipped_into_place() {
        let mut src = RgbaImage::from_pixel(1, 2, Rgba([0, 0, 0, 255]));
        src.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let mut canvas = Canvas::new(4, 4);
        let clip = canvas.bounds();
        // Unit square to the full canvas, y pointing down.
        canvas.draw_image(&src, (4.0, 0.0, 0.0, -4.0, 0.0, 4.0), 1.0, clip);
        let img = canvas.into_image();
        assert_eq!(img.get_pixel(1, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(1, 3).0, [0, 0, 0]);
    }

    #[test]
    fn half_alpha_blends() {
        let mut canvas = Canvas::new(2, 2);
        let clip = canvas.bounds();
        canvas.fill_polygons(&[square(0.0, 0.0, 2.0, 2.0)], false, [0, 0, 0], 0.5, clip);
        assert_eq!(canvas.into_image().get_pixel(0, 0).0, [128, 128, 128]);
    }
}
