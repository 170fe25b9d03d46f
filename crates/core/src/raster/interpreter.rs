//! Content stream interpreter driving a [`Device`].
//!
//! Operators are grouped by category under `raster::ops`, each group an
//! `impl` block on [`PageInterpreter`]. A failing operator is recorded as a
//! [`RenderError`] and skipped; interpretation always runs to the end of the
//! stream.

use super::RenderError;
use super::device::{Device, PathSegment};
use super::state::{DeviceRect, FontMetrics, GraphicState, Matrix, Point};
use crate::document::{Document, Page};
use crate::model::objects::{PDFDict, PDFObject};
use crate::parser::{ContentParser, Operation};
use crate::{PdfError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Form XObjects nested deeper than this are not drawn.
pub const MAX_FORM_DEPTH: usize = 12;

/// Interprets page content for one page.
pub struct PageInterpreter<'a, D: Device> {
    pub(crate) doc: &'a Document,
    pub(crate) device: &'a mut D,
    /// 1-based page number, for issue reports.
    pub(crate) page_number: usize,
    pub(crate) gstate: GraphicState,
    pub(crate) gstack: Vec<GraphicState>,
    pub(crate) curpath: Vec<PathSegment>,
    pub(crate) current_point: Option<Point>,
    pub(crate) subpath_start: Option<Point>,
    /// Set by `W`/`W*`, applied by the next painting operator; the flag is
    /// the even-odd rule.
    pub(crate) pending_clip: Option<bool>,
    /// Resource dictionaries, innermost form last.
    pub(crate) resources: Vec<Option<&'a PDFDict>>,
    pub(crate) font_cache: HashMap<u32, Arc<FontMetrics>>,
    pub(crate) form_depth: usize,
    issues: Vec<RenderError>,
}

impl<'a, D: Device> PageInterpreter<'a, D> {
    /// `ctm` maps default user space to device pixels; `clip` is the
    /// device area.
    pub fn new(
        doc: &'a Document,
        device: &'a mut D,
        page_number: usize,
        ctm: Matrix,
        clip: DeviceRect,
    ) -> Self {
        Self {
            doc,
            device,
            page_number,
            gstate: GraphicState::new(ctm, clip),
            gstack: Vec::new(),
            curpath: Vec::new(),
            current_point: None,
            subpath_start: None,
            pending_clip: None,
            resources: Vec::new(),
            font_cache: HashMap::new(),
            form_depth: 0,
            issues: Vec::new(),
        }
    }

    /// Interpret the page's content streams with its resources.
    pub fn process_page(&mut self, page: &'a Page) {
        let content = page.content(self.doc);
        self.resources.push(page.resources(self.doc));
        self.execute(&content);
        self.resources.pop();
    }

    /// Problems met so far, in stream order.
    pub fn finish(self) -> Vec<RenderError> {
        self.issues
    }

    /// Run one content stream in the current state.
    pub(crate) fn execute(&mut self, content: &[u8]) {
        let parsed = ContentParser::parse(content);
        for e in &parsed.errors {
            self.record("content", e);
        }
        for op in &parsed.operations {
            if let Err(e) = self.dispatch(op) {
                self.record(&op.name(), &e);
            }
        }
    }

    fn record(&mut self, operator: &str, error: &PdfError) {
        warn!(page = self.page_number, operator, error = %error, "skipping content operator");
        self.issues.push(RenderError {
            page: self.page_number,
            operator: operator.to_string(),
            message: error.to_string(),
        });
    }

    fn dispatch(&mut self, op: &Operation) -> Result<()> {
        match op.operator.as_slice() {
            // Graphics state
            b"q" => self.do_q(),
            b"Q" => self.do_Q(),
            b"cm" => {
                let [a, b, c, d, e, f] = self.args(op)?;
                self.do_cm((a, b, c, d, e, f));
            }
            b"w" => {
                let [width] = self.args(op)?;
                self.do_w(width);
            }
            b"J" => {
                let [cap] = self.args(op)?;
                self.do_J(cap as i64);
            }
            b"j" => {
                let [join] = self.args(op)?;
                self.do_j(join as i64);
            }
            b"M" => {
                let [limit] = self.args(op)?;
                self.do_M(limit);
            }
            b"d" => self.do_d(&op.operands)?,
            b"gs" => self.do_gs(self.name_arg(op)?)?,
            b"ri" | b"i" => {}

            // Path construction
            b"m" => {
                let [x, y] = self.args(op)?;
                self.do_m(x, y);
            }
            b"l" => {
                let [x, y] = self.args(op)?;
                self.do_l(x, y);
            }
            b"c" => {
                let [x1, y1, x2, y2, x3, y3] = self.args(op)?;
                self.do_c(x1, y1, x2, y2, x3, y3);
            }
            b"v" => {
                let [x2, y2, x3, y3] = self.args(op)?;
                self.do_v(x2, y2, x3, y3);
            }
            b"y" => {
                let [x1, y1, x3, y3] = self.args(op)?;
                self.do_y(x1, y1, x3, y3);
            }
            b"h" => self.do_h(),
            b"re" => {
                let [x, y, w, h] = self.args(op)?;
                self.do_re(x, y, w, h);
            }

            // Painting and clipping
            b"S" => self.paint(true, false, false, false),
            b"s" => self.paint(true, false, false, true),
            b"f" | b"F" => self.paint(false, true, false, false),
            b"f*" => self.paint(false, true, true, false),
            b"B" => self.paint(true, true, false, false),
            b"B*" => self.paint(true, true, true, false),
            b"b" => self.paint(true, true, false, true),
            b"b*" => self.paint(true, true, true, true),
            b"n" => self.paint(false, false, false, false),
            b"W" => self.pending_clip = Some(false),
            b"W*" => self.pending_clip = Some(true),

            // Color
            b"CS" => self.do_CS(op.operands.last().ok_or_else(|| self.missing(op))?),
            b"cs" => self.do_cs(op.operands.last().ok_or_else(|| self.missing(op))?),
            b"SC" | b"SCN" => self.do_SC(&self.numbers(op)),
            b"sc" | b"scn" => self.do_sc(&self.numbers(op)),
            b"G" => {
                let [gray] = self.args(op)?;
                self.do_G(gray);
            }
            b"g" => {
                let [gray] = self.args(op)?;
                self.do_g(gray);
            }
            b"RG" => {
                let [r, g, b] = self.args(op)?;
                self.do_RG(r, g, b);
            }
            b"rg" => {
                let [r, g, b] = self.args(op)?;
                self.do_rg(r, g, b);
            }
            b"K" => {
                let [c, m, y, k] = self.args(op)?;
                self.do_K(c, m, y, k);
            }
            b"k" => {
                let [c, m, y, k] = self.args(op)?;
                self.do_k(c, m, y, k);
            }

            // Text
            b"BT" => self.do_BT(),
            b"ET" => {}
            b"Tc" => {
                let [space] = self.args(op)?;
                self.gstate.text.charspace = space;
            }
            b"Tw" => {
                let [space] = self.args(op)?;
                self.gstate.text.wordspace = space;
            }
            b"Tz" => {
                let [scale] = self.args(op)?;
                self.gstate.text.scaling = scale;
            }
            b"TL" => {
                let [leading] = self.args(op)?;
                self.gstate.text.leading = leading;
            }
            b"Tr" => {
                let [mode] = self.args(op)?;
                self.gstate.text.render = mode as i64;
            }
            b"Ts" => {
                let [rise] = self.args(op)?;
                self.gstate.text.rise = rise;
            }
            b"Tf" => {
                let [size] = self.args(op)?;
                self.do_Tf(self.name_arg(op)?, size);
            }
            b"Td" => {
                let [tx, ty] = self.args(op)?;
                self.do_Td(tx, ty);
            }
            b"TD" => {
                let [tx, ty] = self.args(op)?;
                self.do_TD(tx, ty);
            }
            b"Tm" => {
                let [a, b, c, d, e, f] = self.args(op)?;
                self.do_Tm((a, b, c, d, e, f));
            }
            b"T*" => self.do_T_star(),
            b"Tj" => self.do_Tj(self.string_arg(op)?),
            b"TJ" => {
                let items = op
                    .operands
                    .last()
                    .and_then(|o| o.as_array().ok())
                    .ok_or_else(|| self.missing(op))?;
                self.do_TJ(items);
            }
            b"'" => {
                let s = self.string_arg(op)?;
                self.do_T_star();
                self.do_Tj(s);
            }
            b"\"" => {
                let s = self.string_arg(op)?;
                let nums = self.numbers(op);
                let [aw, ac] = nums[..] else {
                    return Err(self.missing(op));
                };
                self.gstate.text.wordspace = aw;
                self.gstate.text.charspace = ac;
                self.do_T_star();
                self.do_Tj(s);
            }

            // XObjects and images
            b"Do" => self.do_Do(self.name_arg(op)?)?,
            b"EI" => match op.operands.first() {
                Some(PDFObject::Stream(image)) => self.do_EI(image)?,
                _ => return Err(self.missing(op)),
            },
            b"sh" => {
                return Err(PdfError::InvalidArgument("shading fills are not supported".into()));
            }

            // Marked content, compatibility sections and Type3 glyph metrics.
            b"BMC" | b"BDC" | b"EMC" | b"MP" | b"DP" | b"BX" | b"EX" | b"d0" | b"d1" => {}

            _ => {
                return Err(PdfError::InvalidArgument(format!(
                    "unknown operator {}",
                    op.name()
                )));
            }
        }
        Ok(())
    }

    /// The innermost resource dictionary.
    pub(crate) fn current_resources(&self) -> Option<&'a PDFDict> {
        self.resources.last().copied().flatten()
    }

    /// Look up `/category/name` in the current resources.
    pub(crate) fn resource(&self, category: &str, name: &str) -> Option<&'a PDFObject> {
        let doc = self.doc;
        let entries = doc.resolve_key(self.current_resources()?, category)?;
        entries.as_dict().ok()?.get(name)
    }

    /// The last `N` operands as numbers.
    fn args<const N: usize>(&self, op: &Operation) -> Result<[f64; N]> {
        let start = op
            .operands
            .len()
            .checked_sub(N)
            .ok_or_else(|| self.missing(op))?;
        let mut out = [0.0; N];
        for (slot, operand) in out.iter_mut().zip(&op.operands[start..]) {
            *slot = operand.as_num().map_err(|_| self.missing(op))?;
        }
        Ok(out)
    }

    /// Every numeric operand, in order.
    fn numbers(&self, op: &Operation) -> Vec<f64> {
        op.operands.iter().filter_map(|o| o.as_num().ok()).collect()
    }

    fn name_arg<'o>(&self, op: &'o Operation) -> Result<&'o str> {
        op.operands
            .iter()
            .rev()
            .find_map(|o| o.as_name().ok())
            .ok_or_else(|| self.missing(op))
    }

    fn string_arg<'o>(&self, op: &'o Operation) -> Result<&'o [u8]> {
        op.operands
            .last()
            .and_then(|o| o.as_string().ok())
            .ok_or_else(|| self.missing(op))
    }

    fn missing(&self, op: &Operation) -> PdfError {
        PdfError::InvalidArgument(format!("bad operands for {}", op.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::device::RasterDevice;
    use crate::raster::state::MATRIX_IDENTITY;

    fn run(content: &[u8]) -> (image::RgbImage, Vec<RenderError>) {
        let doc = Document::new();
        let mut device = RasterDevice::new(20, 20);
        let clip = device.canvas().bounds();
        let mut interp = PageInterpreter::new(&doc, &mut device, 1, MATRIX_IDENTITY, clip);
        interp.execute(content);
        let issues = interp.finish();
        (device.into_canvas().into_image(), issues)
    }

    #[test]
    fn unknown_operators_are_recorded_and_skipped() {
        let (img, issues) = run(b"1 0 0 rg foo 0 0 10 10 re f 5 sh");
        assert_eq!(img.get_pixel(5, 5).0, [255, 0, 0]);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].operator, "foo");
        assert_eq!(issues[1].operator, "sh");
        assert_eq!(issues[0].page, 1);
    }

    #[test]
    fn bad_operands_do_not_abort() {
        let (img, issues) = run(b"(x) rg 0 g 0 0 4 4 re f");
        assert_eq!(issues.len(), 1);
        assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0]);
    }

    #[test]
    fn syntax_errors_keep_the_rest_of_the_page() {
        let (img, issues) = run(b"1 0 0 rg 0 0 10 10 re f <zz> Tj 0 0 1 rg 10 10 5 5 re f");
        assert_eq!(img.get_pixel(5, 5).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(12, 12).0, [0, 0, 255]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].operator, "content");

        let (img, issues) = run(b"1 0 0 rg 0 0 10 10 re f BI /W 1 /H 1");
        assert_eq!(img.get_pixel(5, 5).0, [255, 0, 0]);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn save_restore_and_clip() {
        let (img, issues) = run(b"q 0 0 5 5 re W n 0 0 20 20 re f Q 0 0 1 rg 15 15 5 5 re f");
        assert!(issues.is_empty());
        assert_eq!(img.get_pixel(2, 2).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(8, 8).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(17, 17).0, [0, 0, 255]);
    }

    #[test]
    fn marked_content_is_silent() {
        let (_, issues) = run(b"/P <</MCID 0>> BDC EMC BX EX");
        assert!(issues.is_empty());
    }
}
