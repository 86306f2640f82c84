//! # stream-client
//!
//! Client library that keeps a local feature flag store synchronized with
//! a server-pushed event stream.
//!
//! ## Features
//!
//! - **Five event kinds**: `put`, `patch`, `delete`, `indirect/put`, `indirect/patch`
//! - **Transport Abstraction**: Pluggable stream transport (SSE, mock)
//! - **Out-of-band fetches**: Indirect events go through a pluggable requestor
//! - **Fenced full fetches**: A fetched flag set never undoes newer patches
//! - **Pure State Machine**: Uses stream-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flagstream_client::{
//!     HttpRequestor, InMemoryFeatureStore, SseTransport, StreamConfig, StreamProcessor,
//! };
//!
//! let config = StreamConfig::from_file("flagstream.toml".as_ref())?;
//! let transport = SseTransport::new(config.connect_timeout());
//! let requestor = HttpRequestor::new(&config)?;
//! let store = Arc::new(InMemoryFeatureStore::new());
//!
//! let processor = StreamProcessor::new(config, transport, requestor, store);
//! let mut signals = processor.start().await?;
//! signals.wait_ready().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod listener;
pub mod notifier;
pub mod processor;
pub mod requestor;
pub mod store;
mod sync;
#[cfg(test)]
mod test_server;
pub mod transport;

pub use config::{ConfigError, StreamConfig};
pub use notifier::StreamSignals;
pub use processor::{ProcessorError, StreamProcessor};
pub use requestor::{FetchError, HttpRequestor, MockRequestor, Requestor};
pub use store::{FeatureStore, InMemoryFeatureStore};
pub use transport::{
    MockTransport, SseTransport, StreamRequest, Transport, TransportError,
};
