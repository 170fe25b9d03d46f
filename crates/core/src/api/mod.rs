//! File level API.
//!
//! [`ops`] holds the blocking operations, [`async_ops`] their async
//! counterparts, and [`output`] the scratch directory naming and publishing.
//!
//! ```no_run
//! use bluepdf_core::api::split_pdf;
//! use std::path::Path;
//!
//! let part = split_pdf(Path::new("in.pdf"), 2, 4, Path::new("/tmp/scratch"))?;
//! println!("{}", part.display());
//! # Ok::<(), bluepdf_core::PdfError>(())
//! ```

pub mod async_ops;
pub mod ops;
pub mod output;

pub use async_ops::{
    decrypt_pdf_async, encrypt_pdf_async, image_to_pdf_async, merge_pdf_async, pdf_info_async,
    pdf_to_images_async, reorder_pdf_async, rotate_pdf_async, split_pdf_async,
};
pub use ops::{
    PageFailure, PageImages, decrypt_pdf, encrypt_pdf, image_to_pdf, merge_pdf, pdf_info,
    pdf_to_images, reorder_pdf, rotate_pdf, split_pdf,
};
pub use output::{OutputFile, unique_name};
