//! MusicServices service: the catalogue of music services a household can use

pub mod operations;

pub use operations::*;
