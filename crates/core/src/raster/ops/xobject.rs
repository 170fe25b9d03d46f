//! XObject and inline image operators.
//!
//! Handles: Do, BI/ID/EI (reported by the content parser as `EI`)

use crate::model::objects::PDFStream;
use crate::raster::device::Device;
use crate::raster::image::{decode_image, expand_inline_attrs};
use crate::raster::interpreter::{MAX_FORM_DEPTH, PageInterpreter};
use crate::raster::state::{DeviceRect, MATRIX_IDENTITY, apply_matrix_pt, matrix_from_array, mult_matrix};
use crate::{PdfError, Result};
use tracing::debug;

#[allow(non_snake_case)]
impl<'a, D: Device> PageInterpreter<'a, D> {
    /// Paints a named image or form XObject.
    ///
    /// PDF operator: `Do`
    pub fn do_Do(&mut self, name: &str) -> Result<()> {
        let doc = self.doc;
        let stream = self
            .resource("XObject", name)
            .map(|x| doc.resolve(x))
            .and_then(|x| x.as_stream().ok())
            .ok_or_else(|| PdfError::InvalidArgument(format!("XObject /{name} not found")))?;
        match stream.get("Subtype").and_then(|s| s.as_name().ok()) {
            Some("Image") => self.draw_image(stream),
            Some("Form") => self.run_form(stream),
            Some("PS") => Ok(()),
            other => Err(PdfError::InvalidArgument(format!(
                "XObject /{name} has unsupported subtype {other:?}"
            ))),
        }
    }

    /// Paints an inline image.
    ///
    /// PDF operators: `BI`, `ID`, `EI`
    pub fn do_EI(&mut self, image: &PDFStream) -> Result<()> {
        let expanded = PDFStream::new(expand_inline_attrs(&image.attrs), image.get_rawdata().to_vec());
        self.draw_image(&expanded)
    }

    fn draw_image(&mut self, stream: &PDFStream) -> Result<()> {
        let image = decode_image(
            self.doc,
            stream,
            self.current_resources(),
            self.gstate.fill_color,
        )?;
        self.device.render_image(&self.gstate, &image);
        Ok(())
    }

    /// Runs a form's content inside its own state, matrix and bounding box.
    fn run_form(&mut self, form: &'a PDFStream) -> Result<()> {
        if self.form_depth >= MAX_FORM_DEPTH {
            return Err(PdfError::InvalidArgument(format!(
                "form XObjects nested deeper than {MAX_FORM_DEPTH}"
            )));
        }
        let doc = self.doc;
        let content = form.decode()?;
        let matrix = form
            .get("Matrix")
            .and_then(|m| matrix_from_array(doc.resolve(m)))
            .unwrap_or(MATRIX_IDENTITY);
        let resources = doc
            .resolve_key(&form.attrs, "Resources")
            .and_then(|r| r.as_dict().ok())
            .or_else(|| self.current_resources());

        self.do_q();
        self.gstate.ctm = mult_matrix(matrix, self.gstate.ctm);
        let bbox = doc
            .resolve_key(&form.attrs, "BBox")
            .and_then(|b| b.as_array().ok())
            .and_then(|b| b.iter().map(|v| doc.resolve(v).as_num().ok()).collect::<Option<Vec<f64>>>());
        if let Some([x0, y0, x1, y1]) = bbox.as_deref().and_then(|b| <[f64; 4]>::try_from(b).ok()) {
            let ctm = self.gstate.ctm;
            let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)].map(|p| apply_matrix_pt(ctm, p));
            if let Some(rect) = DeviceRect::bounding(corners) {
                self.gstate.clip = self.gstate.clip.intersect(rect);
            }
        }
        let saved_path = std::mem::take(&mut self.curpath);

        debug!(page = self.page_number, depth = self.form_depth + 1, "entering form XObject");
        self.form_depth += 1;
        self.resources.push(resources);
        self.execute(&content);
        self.resources.pop();
        self.form_depth -= 1;

        self.curpath = saved_path;
        self.do_Q();
        Ok(())
    }
}
