//! Sonos household discovery
//!
//! Finds the speakers of a household with a layered fallback:
//! an SSDP multicast search, and when that yields nothing usable, a scan of
//! the local subnets for any single speaker. In both cases the final device
//! list comes from the zone group state of a reachable speaker, so it
//! carries names, coordinators and satellite visibility.
//!
//! # Quick Start
//!
//! ```no_run
//! use sonos_discovery::{discover, DiscoverOptions};
//!
//! # async fn run() -> sonos_discovery::Result<()> {
//! let devices = discover(&DiscoverOptions::default()).await?;
//! for device in devices.values() {
//!     println!("{} at {}", device.name, device.ip);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Cancellation
//!
//! [`Discoverer::discover`] takes a [`CancellationToken`]; cancelling it ends
//! the running stage with [`DiscoveryError::Cancelled`].

mod engine;
mod error;

pub mod device;
pub mod scan;
pub mod ssdp;
pub mod topology;

pub use device::{prefer_device_set, Device, DeviceSet};
pub use engine::{DefaultStrategies, DiscoverOptions, Discoverer, DiscoveryStrategies};
pub use error::{DiscoveryError, Result, TopologyError};
pub use ssdp::SsdpResponse;
pub use tokio_util::sync::CancellationToken;
pub use topology::{fetch_topology, Topology, ZoneGroupInfo};

/// Discover with the network strategies and no external cancellation.
pub async fn discover(options: &DiscoverOptions) -> Result<DeviceSet> {
    Discoverer::<DefaultStrategies>::default()
        .discover(&CancellationToken::new(), options)
        .await
}
