//! Graphics state operators.
//!
//! Handles: q, Q, cm, w, J, j, M, d, gs

use crate::model::objects::PDFObject;
use crate::raster::device::Device;
use crate::raster::interpreter::PageInterpreter;
use crate::raster::state::{Matrix, mult_matrix};
use crate::{PdfError, Result};

#[allow(non_snake_case)]
impl<D: Device> PageInterpreter<'_, D> {
    /// Saves the current graphics state to the stack.
    ///
    /// PDF operator: `q`
    pub fn do_q(&mut self) {
        self.gstack.push(self.gstate.clone());
    }

    /// Restores the graphics state from the stack. An unbalanced `Q` is
    /// ignored.
    ///
    /// PDF operator: `Q`
    pub fn do_Q(&mut self) {
        if let Some(state) = self.gstack.pop() {
            self.gstate = state;
        }
    }

    /// Concatenates a matrix to the current transformation matrix.
    ///
    /// PDF operator: `cm`
    pub fn do_cm(&mut self, matrix: Matrix) {
        self.gstate.ctm = mult_matrix(matrix, self.gstate.ctm);
    }

    /// PDF operator: `w`
    pub fn do_w(&mut self, linewidth: f64) {
        self.gstate.linewidth = linewidth;
    }

    /// PDF operator: `J`
    pub fn do_J(&mut self, linecap: i64) {
        self.gstate.linecap = linecap;
    }

    /// PDF operator: `j`
    pub fn do_j(&mut self, linejoin: i64) {
        self.gstate.linejoin = linejoin;
    }

    /// PDF operator: `M`
    pub fn do_M(&mut self, miterlimit: f64) {
        self.gstate.miterlimit = miterlimit;
    }

    /// Sets the dash pattern. Dashes are recorded but strokes are drawn solid.
    ///
    /// PDF operator: `d`
    pub fn do_d(&mut self, operands: &[PDFObject]) -> Result<()> {
        let [array, phase] = operands else {
            return Err(PdfError::InvalidArgument("d expects an array and a phase".into()));
        };
        let pattern = array
            .as_array()?
            .iter()
            .filter_map(|v| v.as_num().ok())
            .collect();
        self.gstate.dash = (pattern, phase.as_num()?);
        Ok(())
    }

    /// Applies an `/ExtGState` resource: line parameters and constant alpha.
    ///
    /// PDF operator: `gs`
    pub fn do_gs(&mut self, name: &str) -> Result<()> {
        let doc = self.doc;
        let params = self
            .resource("ExtGState", name)
            .map(|p| doc.resolve(p))
            .and_then(|p| p.as_dict().ok())
            .ok_or_else(|| PdfError::InvalidArgument(format!("ExtGState /{name} not found")))?;
        for (key, value) in params {
            let value = doc.resolve(value);
            match key.as_str() {
                "LW" => self.gstate.linewidth = value.as_num()?,
                "LC" => self.gstate.linecap = value.as_int()?,
                "LJ" => self.gstate.linejoin = value.as_int()?,
                "ML" => self.gstate.miterlimit = value.as_num()?,
                "D" => {
                    if let [array, phase] = value.as_array()?.as_slice() {
                        self.do_d(&[array.clone(), phase.clone()])?;
                    }
                }
                "CA" => self.gstate.stroke_alpha = value.as_num()?.clamp(0.0, 1.0),
                "ca" => self.gstate.fill_alpha = value.as_num()?.clamp(0.0, 1.0),
                _ => {}
            }
        }
        Ok(())
    }
}
