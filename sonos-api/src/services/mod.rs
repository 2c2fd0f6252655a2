//! Service modules, one per UPnP service, each holding its typed operations.

pub mod av_transport;
pub mod content_directory;
pub mod device_properties;
pub mod group_rendering_control;
pub mod music_services;
pub mod zone_group_topology;
