//! AVTransport service: the queue and playback
//!
//! Queue and transport actions act on the whole group and are sent to the
//! group coordinator.

pub mod operations;

pub use operations::*;
