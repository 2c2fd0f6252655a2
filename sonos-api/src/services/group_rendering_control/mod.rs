//! GroupRenderingControl service for group-wide volume and mute
//!
//! ```rust,ignore
//! use sonos_api::services::group_rendering_control;
//!
//! let request = group_rendering_control::set_group_volume(75);
//! client.execute_on::<SetGroupVolumeOperation>(&topology, &coordinator, &request).await?;
//! ```
//!
//! Operations must be sent to the group coordinator. Other members answer
//! with UPnP error 701, so the client checks the target against the
//! topology first.

pub mod operations;

pub use operations::*;
