//! Parsing: MIME body resolution, header scraping, field aliasing,
//! content sniffing.

pub mod fields;
pub mod headers;
pub mod mime;
pub mod sniff;
