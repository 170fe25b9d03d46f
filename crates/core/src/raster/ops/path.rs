//! Path construction, painting and clipping operators.
//!
//! Handles: m, l, c, v, y, h, re, S, s, f, F, f*, B, B*, b, b*, n, W, W*
//!
//! Paths are built in user space and handed to the device at paint time.
//! Clipping is approximated by the device-space bounding box of the path.

use crate::raster::device::{Device, PathSegment, flatten_path};
use crate::raster::interpreter::PageInterpreter;
use crate::raster::state::DeviceRect;

impl<D: Device> PageInterpreter<'_, D> {
    /// Begins a new subpath.
    ///
    /// PDF operator: `m`
    pub fn do_m(&mut self, x: f64, y: f64) {
        self.curpath.push(PathSegment::MoveTo((x, y)));
        self.current_point = Some((x, y));
        self.subpath_start = Some((x, y));
    }

    /// PDF operator: `l`
    pub fn do_l(&mut self, x: f64, y: f64) {
        self.curpath.push(PathSegment::LineTo((x, y)));
        self.current_point = Some((x, y));
    }

    /// Cubic Bézier curve with two control points.
    ///
    /// PDF operator: `c`
    pub fn do_c(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.curpath
            .push(PathSegment::CurveTo((x1, y1), (x2, y2), (x3, y3)));
        self.current_point = Some((x3, y3));
    }

    /// Curve whose first control point is the current point.
    ///
    /// PDF operator: `v`
    pub fn do_v(&mut self, x2: f64, y2: f64, x3: f64, y3: f64) {
        let (x1, y1) = self.current_point.unwrap_or((x2, y2));
        self.do_c(x1, y1, x2, y2, x3, y3);
    }

    /// Curve whose second control point is the end point.
    ///
    /// PDF operator: `y`
    pub fn do_y(&mut self, x1: f64, y1: f64, x3: f64, y3: f64) {
        self.do_c(x1, y1, x3, y3, x3, y3);
    }

    /// PDF operator: `h`
    pub fn do_h(&mut self) {
        self.curpath.push(PathSegment::ClosePath);
        self.current_point = self.subpath_start;
    }

    /// Appends a closed rectangle.
    ///
    /// PDF operator: `re`
    pub fn do_re(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.do_m(x, y);
        self.do_l(x + w, y);
        self.do_l(x + w, y + h);
        self.do_l(x, y + h);
        self.do_h();
    }

    /// Paints the current path, applies a pending clip and ends the path.
    pub fn paint(&mut self, stroke: bool, fill: bool, evenodd: bool, close: bool) {
        if close {
            self.curpath.push(PathSegment::ClosePath);
        }
        if !self.curpath.is_empty() {
            self.device
                .paint_path(&self.gstate, stroke, fill, evenodd, &self.curpath);
        }
        if self.pending_clip.take().is_some() {
            let points = flatten_path(&self.curpath, self.gstate.ctm)
                .into_iter()
                .flat_map(|(points, _)| points);
            let bbox = DeviceRect::bounding(points).unwrap_or(DeviceRect {
                x0: 0.0,
                y0: 0.0,
                x1: 0.0,
                y1: 0.0,
            });
            self.gstate.clip = self.gstate.clip.intersect(bbox);
        }
        self.curpath.clear();
        self.current_point = None;
        self.subpath_start = None;
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Document;
    use crate::raster::device::{PathSegment, RasterDevice};
    use crate::raster::interpreter::PageInterpreter;
    use crate::raster::state::MATRIX_IDENTITY;

    #[test]
    fn v_and_y_fill_in_control_points() {
        let doc = Document::new();
        let mut device = RasterDevice::new(4, 4);
        let clip = device.canvas().bounds();
        let mut interp = PageInterpreter::new(&doc, &mut device, 1, MATRIX_IDENTITY, clip);
        interp.do_m(1.0, 1.0);
        interp.do_v(2.0, 2.0, 3.0, 3.0);
        interp.do_y(4.0, 4.0, 5.0, 5.0);
        assert_eq!(
            interp.curpath[1],
            PathSegment::CurveTo((1.0, 1.0), (2.0, 2.0), (3.0, 3.0))
        );
        assert_eq!(
            interp.curpath[2],
            PathSegment::CurveTo((4.0, 4.0), (5.0, 5.0), (5.0, 5.0))
        );
    }

    #[test]
    fn clip_with_empty_path_hides_everything() {
        let doc = Document::new();
        let mut device = RasterDevice::new(4, 4);
        let clip = device.canvas().bounds();
        let mut interp = PageInterpreter::new(&doc, &mut device, 1, MATRIX_IDENTITY, clip);
        interp.pending_clip = Some(false);
        interp.paint(false, false, false, false);
        assert!(interp.gstate.clip.is_empty());
        assert!(interp.curpath.is_empty());
    }
}
