//! ContentDirectory service: browsing favorites, queues and music libraries

pub mod operations;

pub use operations::*;
