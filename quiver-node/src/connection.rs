use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use quiver_lookup::NodeAddress;
use thiserror::Error;

#[derive(Debug, Error)]
/// A failure reported by the broker client for a single operation.
pub enum ConnectionError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    #[error("The connection has been closed.")]
    Closed,

    #[error("The broker rejected the request: {0}")]
    Rejected(String),

    #[error("{0}")]
    Other(anyhow::Error),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// How a message should be handed to a broker node.
pub enum PublishMode {
    /// Enqueue the message on the connection and return without waiting
    /// for the broker to acknowledge it.
    Async,
    /// Wait for the broker to acknowledge the message.
    Sync,
}

#[async_trait]
/// An outbound connection to the data-plane endpoint of a single broker node.
///
/// The wire protocol is owned by the broker client implementing this trait,
/// the pool only relies on the operations below.
pub trait Connection: Send + Sync + 'static {
    /// The data-plane address this connection is attached to.
    fn addr(&self) -> &NodeAddress;

    /// Publishes a message and waits for the broker to acknowledge it.
    async fn publish(&self, topic: &str, body: Bytes) -> Result<(), ConnectionError>;

    /// Publishes a message without waiting for an acknowledgement.
    async fn publish_async(&self, topic: &str, body: Bytes) -> Result<(), ConnectionError>;

    /// Gracefully stops the connection, flushing anything in flight.
    async fn stop(&self);
}

#[async_trait]
/// Opens connections to newly discovered broker nodes.
pub trait Connector: Send + Sync + 'static {
    async fn connect(
        &self,
        addr: &NodeAddress,
    ) -> Result<Arc<dyn Connection>, ConnectionError>;
}
