//! Color operators.
//!
//! Handles: CS, cs, SC, SCN, sc, scn, G, g, RG, rg, K, k

use crate::model::objects::PDFObject;
use crate::raster::device::Device;
use crate::raster::interpreter::PageInterpreter;
use crate::raster::state::{Color, ColorSpace};

#[allow(non_snake_case)]
impl<D: Device> PageInterpreter<'_, D> {
    /// PDF operator: `CS`
    pub fn do_CS(&mut self, space: &PDFObject) {
        let space = ColorSpace::resolve(self.doc, space, self.current_resources());
        self.gstate.stroke_color = space.initial_color();
        self.gstate.stroke_space = space;
    }

    /// PDF operator: `cs`
    pub fn do_cs(&mut self, space: &PDFObject) {
        let space = ColorSpace::resolve(self.doc, space, self.current_resources());
        self.gstate.fill_color = space.initial_color();
        self.gstate.fill_space = space;
    }

    /// Stroke color in the current stroke space. Pattern names are dropped
    /// by the caller.
    ///
    /// PDF operators: `SC`, `SCN`
    pub fn do_SC(&mut self, comps: &[f64]) {
        self.gstate.stroke_color = self.gstate.stroke_space.color(comps);
    }

    /// PDF operators: `sc`, `scn`
    pub fn do_sc(&mut self, comps: &[f64]) {
        self.gstate.fill_color = self.gstate.fill_space.color(comps);
    }

    /// PDF operator: `G`
    pub fn do_G(&mut self, gray: f64) {
        self.gstate.stroke_space = ColorSpace::DeviceGray;
        self.gstate.stroke_color = Color::Gray(gray);
    }

    /// PDF operator: `g`
    pub fn do_g(&mut self, gray: f64) {
        self.gstate.fill_space = ColorSpace::DeviceGray;
        self.gstate.fill_color = Color::Gray(gray);
    }

    /// PDF operator: `RG`
    pub fn do_RG(&mut self, r: f64, g: f64, b: f64) {
        self.gstate.stroke_space = ColorSpace::DeviceRgb;
        self.gstate.stroke_color = Color::Rgb(r, g, b);
    }

    /// PDF operator: `rg`
    pub fn do_rg(&mut self, r: f64, g: f64, b: f64) {
        self.gstate.fill_space = ColorSpace::DeviceRgb;
        self.gstate.fill_color = Color::Rgb(r, g, b);
    }

    /// PDF operator: `K`
    pub fn do_K(&mut self, c: f64, m: f64, y: f64, k: f64) {
        self.gstate.stroke_space = ColorSpace::DeviceCmyk;
        self.gstate.stroke_color = Color::Cmyk(c, m, y, k);
    }

    /// PDF operator: `k`
    pub fn do_k(&mut self, c: f64, m: f64, y: f64, k: f64) {
        self.gstate.fill_space = ColorSpace::DeviceCmyk;
        self.gstate.fill_color = Color::Cmyk(c, m, y, k);
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Document;
    use crate::model::objects::{PDFDict, PDFObject};
    use crate::raster::device::RasterDevice;
    use crate::raster::interpreter::PageInterpreter;
    use crate::raster::state::{Color, ColorSpace, MATRIX_IDENTITY};

    #[test]
    fn named_color_space_from_resources() {
        let doc = Document::new();
        let resources = PDFDict::from([(
            "ColorSpace".to_string(),
            PDFObject::Dict(PDFDict::from([(
                "CS0".to_string(),
                PDFObject::Array(vec![PDFObject::name("DeviceCMYK")]),
            )])),
        )]);
        let mut device = RasterDevice::new(2, 2);
        let clip = device.canvas().bounds();
        let mut interp = PageInterpreter::new(&doc, &mut device, 1, MATRIX_IDENTITY, clip);
        interp.resources.push(Some(&resources));
        interp.do_cs(&PDFObject::name("CS0"));
        assert_eq!(interp.gstate.fill_space, ColorSpace::DeviceCmyk);
        assert_eq!(interp.gstate.fill_color, Color::Cmyk(0.0, 0.0, 0.0, 1.0));
        interp.do_sc(&[0.0, 1.0, 0.0, 0.0]);
        assert_eq!(interp.gstate.fill_color.to_rgb(), [255, 0, 255]);
    }
}
