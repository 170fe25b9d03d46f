//! bluepdf - a PDF engine for parsing, writing, merging, splitting,
//! encrypting and rasterizing documents.
//!
//! - [`document`]: object model, reader with xref recovery, writer, security
//! - [`raster`]: page rendering and image sampling
//! - [`compose`]: images to PDF, merge, split, reorder, rotate, page export
//! - [`engine`]: worker pool, cancellation, shared documents
//! - [`api`]: file level operations writing into a scratch directory

pub mod api;
pub mod codec;
pub mod compose;
pub mod document;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod raster;

pub use document::{Document, Page, ParseOptions};
pub use error::{PdfError, Result};
