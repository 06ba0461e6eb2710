use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use quiver_lookup::NodeAddress;

use crate::connection::{Connection, ConnectionError, Connector, PublishMode};

#[derive(Debug, Clone, PartialEq, Eq)]
/// A message accepted by a [MemoryConnection].
pub struct PublishedMessage {
    pub topic: String,
    pub body: Bytes,
    pub mode: PublishMode,
}

/// An in-memory connection which records every published message.
pub struct MemoryConnection {
    addr: NodeAddress,
    published: Mutex<Vec<PublishedMessage>>,
    failing: AtomicBool,
    stopped: AtomicBool,
}

impl MemoryConnection {
    pub fn new(addr: NodeAddress) -> Arc<Self> {
        Arc::new(Self {
            addr,
            published: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    /// The messages accepted by the connection so far.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }

    pub fn num_published(&self) -> usize {
        self.published.lock().len()
    }

    /// Makes every subsequent publish fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    fn record(
        &self,
        topic: &str,
        body: Bytes,
        mode: PublishMode,
    ) -> Result<(), ConnectionError> {
        if self.is_stopped() {
            return Err(ConnectionError::Closed);
        }

        if self.failing.load(Ordering::Relaxed) {
            return Err(ConnectionError::Rejected(format!(
                "{} is refusing messages",
                self.addr
            )));
        }

        self.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            body,
            mode,
        });
        Ok(())
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn addr(&self) -> &NodeAddress {
        &self.addr
    }

    async fn publish(&self, topic: &str, body: Bytes) -> Result<(), ConnectionError> {
        self.record(topic, body, PublishMode::Sync)
    }

    async fn publish_async(&self, topic: &str, body: Bytes) -> Result<(), ConnectionError> {
        self.record(topic, body, PublishMode::Async)
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

#[derive(Clone, Default)]
/// A connector producing [MemoryConnection]s.
///
/// The most recent connection to each address is kept so tests can inspect it.
pub struct MemoryConnector {
    connections: Arc<Mutex<BTreeMap<NodeAddress, Arc<MemoryConnection>>>>,
    refused: Arc<Mutex<BTreeSet<NodeAddress>>>,
    num_connects: Arc<AtomicUsize>,
}

impl MemoryConnector {
    /// Gets the most recent connection opened to the given address.
    pub fn connection(&self, addr: &NodeAddress) -> Option<Arc<MemoryConnection>> {
        self.connections.lock().get(addr).cloned()
    }

    /// Makes connection attempts to the given address fail.
    pub fn refuse(&self, addr: NodeAddress) {
        self.refused.lock().insert(addr);
    }

    /// Allows connection attempts to a previously refused address.
    pub fn accept(&self, addr: &NodeAddress) {
        self.refused.lock().remove(addr);
    }

    /// The number of connection attempts made so far.
    pub fn num_connects(&self) -> usize {
        self.num_connects.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        addr: &NodeAddress,
    ) -> Result<Arc<dyn Connection>, ConnectionError> {
        self.num_connects.fetch_add(1, Ordering::Relaxed);

        if self.refused.lock().contains(addr) {
            return Err(ConnectionError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{} refused the connection", addr),
            )));
        }

        let connection = MemoryConnection::new(addr.clone());
        self.connections
            .lock()
            .insert(addr.clone(), connection.clone());

        Ok(connection as Arc<dyn Connection>)
    }
}
