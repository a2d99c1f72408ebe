//! # webask Browser CDP
//!
//! Chrome DevTools Protocol adapters for the webask engine.
//!
//! ## Components
//!
//! - [`CdpTabSource`] - lists tabs grouped by window and activates one
//! - [`CdpSnapshotProvider`] - one read-only script evaluation per capture,
//!   with the response region picked by [`page`] strategies
//! - [`ChromeLauncher`] - optional launch with proxy egress
//!
//! ## Usage
//!
//! ```rust,ignore
//! let endpoint = DevToolsEndpoint::new("http://localhost:9222")?;
//! let connection = Arc::new(CdpConnection::new(endpoint));
//! let tabs = CdpTabSource::new(connection.clone());
//! let snapshots = CdpSnapshotProvider::new(connection);
//! ```

pub mod auth;
pub mod cdp;
pub mod connection;
pub mod launcher;
pub mod page;
pub mod snapshot;
pub mod tabs;

pub use auth::ProxyCredentials;
pub use cdp::{CdpClient, CdpError, DevToolsEndpoint};
pub use connection::CdpConnection;
pub use launcher::{ChromeLauncher, LaunchConfig, LaunchStatus, ProxySettings};
pub use page::{PageExtractor, Region, RenderedPage};
pub use snapshot::CdpSnapshotProvider;
pub use tabs::CdpTabSource;
