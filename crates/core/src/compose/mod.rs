//! Building documents out of images and other documents.
//!
//! - `import`: page copying with object renumbering
//! - `images`: one page per image
//! - `pages`: merge, split, reorder, rotate
//! - `extract`: batched rendering of every page

pub mod extract;
pub mod images;
pub mod import;
pub mod pages;

pub use extract::{PageResult, batch_size, extract_all_pages, extract_pages_with};
pub use images::images_to_document;
pub use import::PageImporter;
pub use pages::{merge, reorder, rotate, split};
