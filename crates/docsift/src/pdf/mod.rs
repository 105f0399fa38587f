//! PDF helpers built on `lopdf`.

pub mod error;
pub mod images;

pub use error::PdfError;
pub use images::{PageImageResolver, decode_image_xobject};
