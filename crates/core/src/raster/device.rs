//! Output devices receiving paint calls from the page interpreter.

use super::canvas::Canvas;
use super::state::{GraphicState, Matrix, Point, apply_matrix_pt};
use image::RgbaImage;

/// Curves are flattened into at most this many line segments.
const MAX_CURVE_SEGMENTS: usize = 64;

/// Path segment types, in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    /// Control point 1, control point 2, end point.
    CurveTo(Point, Point, Point),
    ClosePath,
}

/// Receiver of painting operations.
///
/// All geometry arrives in user space; `state.ctm` maps it to device space.
pub trait Device {
    /// Paint a path. Both flags false is a no-op (the `n` operator).
    fn paint_path(
        &mut self,
        state: &GraphicState,
        stroke: bool,
        fill: bool,
        evenodd: bool,
        path: &[PathSegment],
    );

    /// Paint an image into the unit square of user space.
    fn render_image(&mut self, state: &GraphicState, image: &RgbaImage);

    /// Paint a glyph placeholder: `glyph` maps the unit square to user space.
    fn render_glyph(&mut self, state: &GraphicState, glyph: Matrix, stroke: bool);
}

/// Flatten `path` into device-space subpaths; the flag marks closed ones.
pub fn flatten_path(path: &[PathSegment], ctm: Matrix) -> Vec<(Vec<Point>, bool)> {
    let mut subpaths: Vec<(Vec<Point>, bool)> = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut start: Option<Point> = None;

    for seg in path {
        match *seg {
            PathSegment::MoveTo(p) => {
                if current.len() > 1 {
                    subpaths.push((std::mem::take(&mut current), false));
                }
                current.clear();
                let p = apply_matrix_pt(ctm, p);
                current.push(p);
                start = Some(p);
            }
            PathSegment::LineTo(p) => current.push(apply_matrix_pt(ctm, p)),
            PathSegment::CurveTo(c1, c2, end) => {
                let Some(&p0) = current.last() else {
                    continue;
                };
                let (p1, p2, p3) = (
                    apply_matrix_pt(ctm, c1),
                    apply_matrix_pt(ctm, c2),
                    apply_matrix_pt(ctm, end),
                );
                let hull = dist(p0, p1) + dist(p1, p2) + dist(p2, p3);
                let steps = ((hull / 4.0).ceil() as usize).clamp(2, MAX_CURVE_SEGMENTS);
                for i in 1..=steps {
                    let t = i as f64 / steps as f64;
                    current.push(cubic_point(p0, p1, p2, p3, t));
                }
            }
            PathSegment::ClosePath => {
                if !current.is_empty() {
                    let restart = start.or_else(|| current.first().copied());
                    subpaths.push((std::mem::take(&mut current), true));
                    // A new subpath starts at the closed one's origin.
                    if let Some(p) = restart {
                        current.push(p);
                    }
                }
            }
        }
    }
    if current.len() > 1 {
        subpaths.push((current, false));
    }
    subpaths
}

fn dist(a: Point, b: Point) -> f64 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    (
        a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
        a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
    )
}

/// Device rasterizing into a [`Canvas`].
#[derive(Debug)]
pub struct RasterDevice {
    canvas: Canvas,
}

impl RasterDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Canvas::new(width, height),
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }
}

impl Device for RasterDevice {
    fn paint_path(
        &mut self,
        state: &GraphicState,
        stroke: bool,
        fill: bool,
        evenodd: bool,
        path: &[PathSegment],
    ) {
        if !stroke && !fill {
            return;
        }
        let subpaths = flatten_path(path, state.ctm);
        if fill {
            let polygons: Vec<Vec<Point>> = subpaths.iter().map(|(p, _)| p.clone()).collect();
            self.canvas.fill_polygons(
                &polygons,
                evenodd,
                state.fill_color.to_rgb(),
                state.fill_alpha,
                state.clip,
            );
        }
        if stroke {
            let (a, b, c, d, _, _) = state.ctm;
            // Average scale of the CTM applied to the user-space line width.
            let scale = ((a * d - b * c).abs()).sqrt();
            self.canvas.stroke_polylines(
                &subpaths,
                state.linewidth * scale,
                state.stroke_color.to_rgb(),
                state.stroke_alpha,
                state.clip,
            );
        }
    }

    fn render_image(&mut self, state: &GraphicState, image: &RgbaImage) {
        self.canvas
            .draw_image(image, state.ctm, state.fill_alpha, state.clip);
    }

    fn render_glyph(&mut self, state: &GraphicState, glyph: Matrix, stroke: bool) {
        let corners: Vec<Point> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .into_iter()
            .map(|p| apply_matrix_pt(state.ctm, apply_matrix_pt(glyph, p)))
            .collect();
        let (color, alpha) = if stroke {
            (state.stroke_color, state.stroke_alpha)
        } else {
            (state.fill_color, state.fill_alpha)
        };
        self.canvas
            .fill_polygons(&[corners], false, color.to_rgb(), alpha, state.clip);
    }
}
