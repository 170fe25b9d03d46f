//! Building a document with one page per image.

use crate::document::Document;
use crate::model::objects::{PDFDict, PDFObject, PDFStream};
use crate::raster::encode_jpeg;
use crate::{PdfError, Result};
use image::DynamicImage;
use tracing::debug;

/// One page per image, each page exactly the image's pixel size in points.
///
/// With `quality` the images are stored as JPEG (`DCTDecode`), otherwise
/// as Flate-compressed samples. Grayscale images stay single channel.
pub fn images_to_document(images: &[DynamicImage], quality: Option<u8>) -> Result<Document> {
    if images.is_empty() {
        return Err(PdfError::InvalidArgument("no images to convert".into()));
    }
    let mut doc = Document::new();
    let pages_root = doc.pages_root_id()?;
    let mut kids = Vec::with_capacity(images.len());

    for image in images {
        let (width, height) = (image.width(), image.height());
        let xobject = image_xobject(image, quality)?;
        let xobject_ref = doc.add_object(xobject);

        let content = format!("q\n{width} 0 0 {height} 0 0 cm\n/Im0 Do\nQ\n");
        let content_ref = doc.add_object(PDFStream::flate(PDFDict::new(), content.as_bytes())?);

        let resources = PDFDict::from([(
            "XObject".to_string(),
            PDFObject::Dict(PDFDict::from([(
                "Im0".to_string(),
                PDFObject::Ref(xobject_ref),
            )])),
        )]);
        let page = PDFDict::from([
            ("Type".to_string(), PDFObject::name("Page")),
            ("Parent".to_string(), PDFObject::reference(pages_root)),
            (
                "MediaBox".to_string(),
                PDFObject::number_array(&[0.0, 0.0, f64::from(width), f64::from(height)]),
            ),
            ("Resources".to_string(), PDFObject::Dict(resources)),
            ("Contents".to_string(), PDFObject::Ref(content_ref)),
        ]);
        kids.push(PDFObject::Ref(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.set_object(
        pages_root,
        PDFDict::from([
            ("Type".to_string(), PDFObject::name("Pages")),
            ("Kids".to_string(), PDFObject::Array(kids)),
            ("Count".to_string(), PDFObject::Int(count)),
        ]),
    );
    debug!(pages = count, jpeg = quality.is_some(), "built document from images");
    Ok(doc)
}

fn image_xobject(image: &DynamicImage, quality: Option<u8>) -> Result<PDFStream> {
    let gray = matches!(image, DynamicImage::ImageLuma8(_));
    let attrs = PDFDict::from([
        ("Type".to_string(), PDFObject::name("XObject")),
        ("Subtype".to_string(), PDFObject::name("Image")),
        ("Width".to_string(), PDFObject::Int(i64::from(image.width()))),
        ("Height".to_string(), PDFObject::Int(i64::from(image.height()))),
        (
            "ColorSpace".to_string(),
            PDFObject::name(if gray { "DeviceGray" } else { "DeviceRGB" }),
        ),
        ("BitsPerComponent".to_string(), PDFObject::Int(8)),
    ]);
    match quality {
        Some(q) => {
            let mut attrs = attrs;
            attrs.insert("Filter".into(), PDFObject::name("DCTDecode"));
            Ok(PDFStream::new(attrs, encode_jpeg(image, q)?))
        }
        None if gray => PDFStream::flate(attrs, image.as_bytes()),
        None => PDFStream::flate(attrs, image.to_rgb8().as_raw()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{RenderOptions, render};
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            images_to_document(&[], None),
            Err(PdfError::InvalidArgument(_))
        ));
    }

    #[test]
    fn page_size_follows_pixels() {
        let images = [
            DynamicImage::ImageRgb8(RgbImage::new(30, 20)),
            DynamicImage::ImageLuma8(GrayImage::new(10, 40)),
        ];
        let doc = images_to_document(&images, Some(80)).unwrap();
        let pages = doc.pages().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].size(), (30.0, 20.0));
        assert_eq!(pages[1].size(), (10.0, 40.0));

        let xobj = pages[1]
            .resources(&doc)
            .and_then(|r| doc.resolve_key(r, "XObject"))
            .and_then(|x| x.as_dict().ok())
            .and_then(|x| doc.resolve_key(x, "Im0"))
            .unwrap()
            .as_stream()
            .unwrap();
        assert_eq!(xobj.get("Filter"), Some(&PDFObject::name("DCTDecode")));
        assert_eq!(xobj.get("ColorSpace"), Some(&PDFObject::name("DeviceGray")));
    }

    #[test]
    fn flate_pages_render_back_to_the_image() {
        let mut img = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        for y in 4..8 {
            for x in 0..8 {
                img.put_pixel(x, y, Rgb([0, 0, 255]));
            }
        }
        let doc = images_to_document(&[DynamicImage::ImageRgb8(img)], None).unwrap();
        let page = doc.page(0).unwrap();
        let options = RenderOptions {
            dpi: 72.0,
            ..RenderOptions::default()
        };
        let rendered = render(&doc, &page, &options).unwrap();
        assert!(rendered.issues.is_empty());
        let out = rendered.image.to_rgb8();
        assert_eq!(out.get_pixel(3, 1).0, [255, 255, 255]);
        assert_eq!(out.get_pixel(3, 6).0, [0, 0, 255]);

        let gray = GrayImage::from_pixel(2, 2, Luma([7]));
        let doc = images_to_document(&[DynamicImage::ImageLuma8(gray)], None).unwrap();
        assert_eq!(doc.page_count(), 1);
    }
}
