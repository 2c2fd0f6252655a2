//! Typed Sonos control
//!
//! This crate provides type-safe UPnP operations on top of the private
//! `soap-client` crate, and a group-level controller on top of them.
//!
//! - [`SonosOperation`] types, grouped per UPnP service under [`services`],
//!   executed with [`SonosClient::execute`], or [`SonosClient::execute_on`]
//!   for group-scoped services
//! - [`GroupController`], bound to a group coordinator: group volume and
//!   mute, queueing music-service references, Sonos Favorites
//! - [`ReferenceTranslator`] and its Spotify implementation
//!
//! # Group control
//!
//! ```rust,no_run
//! use sonos_api::{EnqueueOptions, GroupController, SonosClient, Target};
//!
//! # async fn run() -> sonos_api::Result<()> {
//! let group = GroupController::connect(SonosClient::new(), &Target::parse("Kitchen")).await?;
//! group.set_group_volume(30).await?;
//! group
//!     .enqueue_spotify("spotify:album:4aawyAB9vmqN3uQ7FjRGTy", EnqueueOptions { play_now: true })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod controller;
pub mod error;
pub mod operation;
pub mod reference;
pub mod service;
pub mod services;

pub use client::SonosClient;
pub use controller::{ensure_coordinator, resolve_coordinator, EnqueueOptions, GroupController, Target};
pub use error::{ControlError, Result};
pub use operation::{SonosOperation, Validate, ValidationError, ValidationLevel};
pub use reference::{ReferenceTranslator, SpotifyKind, SpotifyRef, SpotifyTranslator, TranslatedRef};
pub use service::{Service, ServiceInfo};
