//! Building blocks shared by the document parsers
//!
//! - [`xml_decode`]: namespace stripping in front of serde
//! - [`didl`]: DIDL-Lite item model, parser and writer

pub mod didl;
pub mod xml_decode;

pub use didl::{favorite_uri, parse_didl_items, DidlItem};
