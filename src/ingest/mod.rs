//! Upstream ingestion: validation, reconnects and the command/event protocol
//!
//! [`IngestionController`] feeds a [`StreamStats`](crate::statistics::StreamStats)
//! from any [`Connector`]. With the `ws` feature, [`ws::WsConnector`]
//! provides a WebSocket transport.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use quotestats::ingest::{spawn, Event, IngestConfig};
//! # use quotestats::ingest::{Connection, Connector, ConnectionError};
//! # struct Feed;
//! # #[async_trait::async_trait]
//! # impl Connector for Feed {
//! #     async fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
//! #         Err(ConnectionError::Closed)
//! #     }
//! # }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ingestion = spawn(IngestConfig::new("wss://feed.example/quotes"), Arc::new(Feed))?;
//! ingestion.handle.start()?;
//! ingestion.handle.get_stats()?;
//!
//! while let Some(event) = ingestion.events.recv().await {
//!     if let Event::Stats(snapshot) = event {
//!         println!("{} quotes, {} lost", snapshot.count, snapshot.lost);
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod controller;
mod error;
mod protocol;
mod record;

#[cfg(feature = "ws")]
#[cfg_attr(docsrs, doc(cfg(feature = "ws")))]
pub mod ws;

pub use config::IngestConfig;
pub use connection::{Connection, Connector};
pub use controller::{spawn, ConnectionState, Ingestion, IngestionController, IngestionHandle};
pub use error::{ConnectionError, ControllerGone, RecordError};
pub use protocol::{Command, Event};
pub use record::{parse_quote, Quote, DEFAULT_MAX_VALUE};
