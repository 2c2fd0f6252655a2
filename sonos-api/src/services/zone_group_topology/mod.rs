//! ZoneGroupTopology service: household grouping

pub mod operations;

pub use operations::*;
