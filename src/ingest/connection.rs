//! The upstream duplex connection, as seen by the controller
//!
//! The controller only needs to open a connection, read text frames until the
//! peer goes away, optionally write a frame, and close. Transports implement
//! [`Connector`] and [`Connection`]; tests substitute in-memory fakes.

use async_trait::async_trait;

use super::error::ConnectionError;

/// An open upstream connection
#[async_trait]
pub trait Connection: Send {
    /// Next inbound text frame
    ///
    /// `None` means the connection closed. Must be cancel safe: the
    /// controller drops a pending `recv` whenever another event wins.
    async fn recv(&mut self) -> Option<Result<String, ConnectionError>>;

    /// Write a text frame upstream
    async fn send(&mut self, text: &str) -> Result<(), ConnectionError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Opens connections to one endpoint
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError>;
}
