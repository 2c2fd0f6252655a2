//! Music services for Sonos households
//!
//! - [`MusicServiceRegistry`]: the services a household can use, and their
//!   presentation maps (search categories)
//! - [`AuthFlow`]: DeviceLink / AppLink account linking
//! - [`FileTokenStore`]: owner-only persistence of linked-account tokens
//! - [`SmapiSearchClient`]: searching a service with the linked account
//!
//! # Linking an account
//!
//! ```rust,no_run
//! use smapi::{AuthFlow, AuthError, FileTokenStore, MusicServiceRegistry};
//! use soap_client::SoapClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = MusicServiceRegistry::default();
//! let service = registry.find("192.168.1.50", "Spotify").await?;
//! let household = registry.household_id("192.168.1.50").await?;
//!
//! let flow = AuthFlow::new(SoapClient::new(), FileTokenStore::open_default()?, "RINCON_000E58A0123456");
//! let session = flow.begin(&service, &household).await?;
//! println!("Open {} and enter {}", session.reg_url, session.link_code);
//!
//! loop {
//!     match flow.complete(&session).await {
//!         Ok(_) => break,
//!         Err(AuthError::NotLinkedYet) => tokio::time::sleep(std::time::Duration::from_secs(5)).await,
//!         Err(e) => return Err(e.into()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod credentials;
pub mod error;
pub mod registry;
pub mod search;
pub mod tokens;

pub use auth::{AuthFlow, LinkSession};
pub use credentials::SMAPI_NS;
pub use error::{AuthError, Result, SmapiError, StoreError};
pub use registry::{find_service, MusicServiceRegistry, MAX_PRESENTATION_MAP_BYTES};
pub use search::{SearchItem, SearchItemKind, SearchRequest, SearchResult, SmapiSearchClient};
pub use tokens::{
    default_token_path, FileTokenStore, MemoryTokenStore, SmapiTokenPair, TokenReader,
    TokenWriter, TOKEN_PATH_ENV,
};
