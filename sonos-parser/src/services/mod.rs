//! Parsers for service-specific documents
//!
//! - [`zone_group_topology`]: `GetZoneGroupState` payloads
//! - [`music_services`]: `ListAvailableServices` descriptor lists
//! - [`presentation_map`]: SMAPI presentation maps (search categories)

pub mod music_services;
pub mod presentation_map;
pub mod zone_group_topology;
