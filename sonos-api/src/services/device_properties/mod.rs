//! DeviceProperties service: per-device identity

pub mod operations;

pub use operations::*;
