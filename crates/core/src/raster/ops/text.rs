//! Text object operators.
//!
//! Handles: BT, Tf, Td, TD, Tm, T*, Tj, TJ (and `'`, `"` through them)
//!
//! No font programs are read. Each glyph is drawn as a greeked box sized
//! from the font's advance width so page layout stays recognizable.

use crate::model::objects::PDFObject;
use crate::raster::device::Device;
use crate::raster::interpreter::PageInterpreter;
use crate::raster::state::{FontMetrics, Matrix, mult_matrix};
use std::sync::Arc;

/// Greeked box height, in text space units.
const GLYPH_BOX_HEIGHT: f64 = 0.5;

/// Share of the advance width covered by the box, centered.
const GLYPH_BOX_COVERAGE: f64 = 0.8;

#[allow(non_snake_case)]
impl<D: Device> PageInterpreter<'_, D> {
    /// Begins a text object.
    ///
    /// PDF operator: `BT`
    pub fn do_BT(&mut self) {
        self.gstate.text.reset();
    }

    /// Selects a font from `/Font` resources. Unknown fonts keep default
    /// metrics.
    ///
    /// PDF operator: `Tf`
    pub fn do_Tf(&mut self, name: &str, size: f64) {
        let doc = self.doc;
        let font = match self.resource("Font", name) {
            Some(PDFObject::Ref(r)) => match self.font_cache.get(&r.objid) {
                Some(cached) => Arc::clone(cached),
                None => {
                    let metrics = Arc::new(
                        doc.get_object(r.objid)
                            .and_then(|f| f.as_dict().ok())
                            .map(|f| FontMetrics::from_font(doc, f))
                            .unwrap_or_default(),
                    );
                    self.font_cache.insert(r.objid, Arc::clone(&metrics));
                    metrics
                }
            },
            Some(PDFObject::Dict(f)) => Arc::new(FontMetrics::from_font(doc, f)),
            _ => Arc::default(),
        };
        let text = &mut self.gstate.text;
        text.fontname = Some(name.to_string());
        text.fontsize = size;
        text.font = font;
    }

    /// Moves to the start of the next line, offset by (tx, ty).
    ///
    /// PDF operator: `Td`
    pub fn do_Td(&mut self, tx: f64, ty: f64) {
        let text = &mut self.gstate.text;
        text.linematrix = mult_matrix((1.0, 0.0, 0.0, 1.0, tx, ty), text.linematrix);
        text.matrix = text.linematrix;
    }

    /// Like `Td`, also setting the leading to `-ty`.
    ///
    /// PDF operator: `TD`
    pub fn do_TD(&mut self, tx: f64, ty: f64) {
        self.gstate.text.leading = -ty;
        self.do_Td(tx, ty);
    }

    /// PDF operator: `Tm`
    pub fn do_Tm(&mut self, matrix: Matrix) {
        self.gstate.text.matrix = matrix;
        self.gstate.text.linematrix = matrix;
    }

    /// PDF operator: `T*`
    pub fn do_T_star(&mut self) {
        let leading = self.gstate.text.leading;
        self.do_Td(0.0, -leading);
    }

    /// Shows a string, advancing the text matrix per glyph.
    ///
    /// PDF operator: `Tj`
    pub fn do_Tj(&mut self, s: &[u8]) {
        let font = Arc::clone(&self.gstate.text.font);
        let render = self.gstate.text.render;
        let visible = !matches!(render, 3 | 7);
        let stroke_only = matches!(render, 1 | 5);
        for code in font.codes(s) {
            let text = &self.gstate.text;
            let hscale = text.scaling / 100.0;
            let width = font.width(code) / 1000.0;
            let is_space = !font.two_byte && code == 32;

            if visible && !is_space && width > 0.0 && text.fontsize != 0.0 {
                let trm = mult_matrix(
                    (text.fontsize * hscale, 0.0, 0.0, text.fontsize, 0.0, text.rise),
                    text.matrix,
                );
                let inset = width * (1.0 - GLYPH_BOX_COVERAGE) / 2.0;
                let glyph = mult_matrix(
                    (width * GLYPH_BOX_COVERAGE, 0.0, 0.0, GLYPH_BOX_HEIGHT, inset, 0.0),
                    trm,
                );
                self.device.render_glyph(&self.gstate, glyph, stroke_only);
            }

            let text = &self.gstate.text;
            let word = if is_space { text.wordspace } else { 0.0 };
            let tx = (width * text.fontsize + text.charspace + word) * hscale;
            self.gstate.text.matrix = mult_matrix((1.0, 0.0, 0.0, 1.0, tx, 0.0), self.gstate.text.matrix);
        }
    }

    /// Shows strings with individual positioning adjustments.
    ///
    /// PDF operator: `TJ`
    pub fn do_TJ(&mut self, items: &[PDFObject]) {
        for item in items {
            match item {
                PDFObject::String(s) => self.do_Tj(s),
                other => {
                    if let Ok(adjust) = other.as_num() {
                        let text = &self.gstate.text;
                        let tx = -adjust / 1000.0 * text.fontsize * text.scaling / 100.0;
                        self.gstate.text.matrix =
                            mult_matrix((1.0, 0.0, 0.0, 1.0, tx, 0.0), self.gstate.text.matrix);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Document;
    use crate::model::objects::PDFObject;
    use crate::raster::device::RasterDevice;
    use crate::raster::interpreter::PageInterpreter;
    use crate::raster::state::MATRIX_IDENTITY;

    #[test]
    fn text_advances_with_default_widths() {
        let doc = Document::new();
        let mut device = RasterDevice::new(100, 20);
        let clip = device.canvas().bounds();
        let mut interp = PageInterpreter::new(&doc, &mut device, 1, MATRIX_IDENTITY, clip);
        interp.do_BT();
        interp.do_Tf("F1", 10.0);
        interp.do_Td(5.0, 2.0);
        interp.do_Tj(b"ab");
        // Two glyphs at 500/1000 em of 10 units each.
        assert_eq!(interp.gstate.text.matrix.4, 15.0);
        interp.do_TJ(&[PDFObject::Int(-1000), PDFObject::String(b" ".to_vec())]);
        assert_eq!(interp.gstate.text.matrix.4, 30.0);
        interp.gstate.text.leading = 12.0;
        interp.do_T_star();
        assert_eq!(interp.gstate.text.matrix, (1.0, 0.0, 0.0, 1.0, 5.0, -10.0));
        assert!(interp.finish().is_empty());
    }

    #[test]
    fn glyph_boxes_are_painted() {
        let doc = Document::new();
        let mut device = RasterDevice::new(40, 40);
        let clip = device.canvas().bounds();
        let mut interp = PageInterpreter::new(&doc, &mut device, 1, MATRIX_IDENTITY, clip);
        interp.do_BT();
        interp.do_Tf("F1", 20.0);
        interp.do_Td(0.0, 10.0);
        interp.do_Tj(b"x");
        assert!(interp.finish().is_empty());
        let img = device.into_canvas().into_image();
        assert_eq!(img.get_pixel(5, 12).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(5, 25).0, [255, 255, 255]);
    }
}
