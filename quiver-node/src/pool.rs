use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use quiver_lookup::{NodeAddress, NodeAddresses};
use tokio::time::Instant;

use crate::connection::{Connection, PublishMode};
use crate::error::PublishError;
use crate::statistics::PoolStatistics;

/// A live outbound connection to one broker node.
pub struct PoolEntry {
    addrs: NodeAddresses,
    ready_after: Instant,
    connection: Arc<dyn Connection>,
}

impl PoolEntry {
    pub(crate) fn new(
        addrs: NodeAddresses,
        ready_after: Instant,
        connection: Arc<dyn Connection>,
    ) -> Self {
        Self {
            addrs,
            ready_after,
            connection,
        }
    }

    #[inline]
    /// The addresses of the broker node.
    pub fn addrs(&self) -> &NodeAddresses {
        &self.addrs
    }

    #[inline]
    /// The instant from which the entry may be used for publishing.
    pub fn ready_after(&self) -> Instant {
        self.ready_after
    }

    #[inline]
    /// Returns if the warm-up period of the entry has elapsed.
    pub fn is_ready(&self, now: Instant) -> bool {
        now >= self.ready_after
    }

    #[inline]
    /// The connection to the broker node.
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }
}

impl Debug for PoolEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolEntry")
            .field("addrs", &self.addrs)
            .field("ready_after", &self.ready_after)
            .finish()
    }
}

#[derive(Default)]
/// The addresses of every node currently in the pool.
struct KnownNodes {
    tcp: BTreeSet<NodeAddress>,
    http: BTreeSet<NodeAddress>,
}

#[derive(Default)]
struct PoolState {
    entries: Vec<Arc<PoolEntry>>,
    known: KnownNodes,
}

#[derive(Clone, Default)]
/// The set of connections messages are load balanced across.
///
/// Membership is only changed by the topology tracker, publishing can happen
/// concurrently from any number of tasks. The cursor is advanced atomically
/// and always taken modulo the length observed under the lock, so a pool
/// shrinking mid-publish can cause a candidate to be skipped or repeated but
/// never an out of bounds access.
pub struct PublisherPool {
    state: Arc<RwLock<PoolState>>,
    cursor: Arc<AtomicUsize>,
    statistics: PoolStatistics,
}

impl PublisherPool {
    /// Creates a new empty pool reporting into the given statistics.
    pub fn new(statistics: PoolStatistics) -> Self {
        Self {
            state: Arc::default(),
            cursor: Arc::default(),
            statistics,
        }
    }

    #[inline]
    /// The number of broker nodes in the pool.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    #[inline]
    /// Returns if the pool has no broker nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    /// Gets the live pool statistics.
    pub fn statistics(&self) -> &PoolStatistics {
        &self.statistics
    }

    /// Returns if the given data-plane address is part of the pool.
    pub fn contains(&self, addr: &NodeAddress) -> bool {
        self.state.read().known.tcp.contains(addr)
    }

    /// The data-plane addresses of every node in the pool.
    pub fn data_addresses(&self) -> BTreeSet<NodeAddress> {
        self.state.read().known.tcp.clone()
    }

    /// The admin addresses of every node in the pool.
    pub fn admin_addresses(&self) -> BTreeSet<NodeAddress> {
        self.state.read().known.http.clone()
    }

    /// A snapshot of the current entries in round-robin order.
    pub fn entries(&self) -> Vec<Arc<PoolEntry>> {
        self.state.read().entries.clone()
    }

    /// The current position of the round-robin cursor.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Adds a new entry to the pool.
    ///
    /// Returns `false` if an entry already exists for the data-plane address,
    /// in which case the pool is left untouched.
    pub(crate) fn admit(&self, entry: PoolEntry) -> bool {
        let mut state = self.state.write();
        if state.known.tcp.contains(&entry.addrs.tcp) {
            return false;
        }

        state.known.tcp.insert(entry.addrs.tcp.clone());
        state.known.http.insert(entry.addrs.http.clone());
        state.entries.push(Arc::new(entry));

        self.statistics
            .num_nodes
            .store(state.entries.len() as u64, Ordering::Relaxed);
        self.statistics.num_admitted.fetch_add(1, Ordering::Relaxed);

        true
    }

    /// Removes the entry for the given data-plane address.
    ///
    /// The round-robin cursor is reset as positions after the removed entry
    /// have shifted. The caller is responsible for stopping the connection.
    pub(crate) fn evict(&self, addr: &NodeAddress) -> Option<Arc<PoolEntry>> {
        let mut state = self.state.write();
        let position = state
            .entries
            .iter()
            .position(|entry| &entry.addrs.tcp == addr)?;

        let entry = state.entries.remove(position);
        state.known.tcp.remove(&entry.addrs.tcp);
        state.known.http.remove(&entry.addrs.http);
        self.cursor.store(0, Ordering::Relaxed);

        self.statistics
            .num_nodes
            .store(state.entries.len() as u64, Ordering::Relaxed);
        self.statistics.num_evicted.fetch_add(1, Ordering::Relaxed);

        Some(entry)
    }

    /// Removes every entry from the pool.
    pub(crate) fn drain(&self) -> Vec<Arc<PoolEntry>> {
        let mut state = self.state.write();
        state.known = KnownNodes::default();
        self.cursor.store(0, Ordering::Relaxed);
        self.statistics.num_nodes.store(0, Ordering::Relaxed);

        std::mem::take(&mut state.entries)
    }

    /// Advances the cursor and returns the entry at its new position.
    ///
    /// Returns `None` if the pool is empty.
    fn next_candidate(&self) -> Option<Arc<PoolEntry>> {
        let state = self.state.read();
        let len = state.entries.len();
        if len == 0 {
            return None;
        }

        let previous = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cursor| {
                Some((cursor % len + 1) % len)
            })
            .unwrap_or_else(|cursor| cursor);
        let position = (previous % len + 1) % len;

        state.entries.get(position).cloned()
    }

    /// Publishes a message to one of the broker nodes in the pool.
    ///
    /// Candidates are tried in round-robin order, each node at most once.
    /// Nodes which are still warming up are skipped and a failure on one node
    /// falls through to the next. The first node to accept the message ends
    /// the call, there is no indication of which node that was.
    pub async fn publish(
        &self,
        topic: &str,
        body: Bytes,
        mode: PublishMode,
    ) -> Result<(), PublishError> {
        let attempts = self.len();
        if attempts == 0 {
            error!(topic = topic, "No broker nodes available to publish to.");
            return Err(PublishError::NoNodes);
        }

        for _ in 0..attempts {
            let entry = match self.next_candidate() {
                Some(entry) => entry,
                None => break,
            };

            if !entry.is_ready(Instant::now()) {
                trace!(addr = %entry.addrs.tcp, "Skipping node which is still warming up.");
                self.statistics
                    .num_skipped_warming
                    .fetch_add(1, Ordering::Relaxed);
                continue;
            }

            debug!(topic = topic, addr = %entry.addrs.tcp, mode = ?mode, "Publishing message.");
            let result = match mode {
                PublishMode::Sync => entry.connection.publish(topic, body.clone()).await,
                PublishMode::Async => {
                    entry.connection.publish_async(topic, body.clone()).await
                },
            };

            match result {
                Ok(()) => {
                    self.statistics.num_published.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                },
                Err(e) => {
                    error!(
                        topic = topic,
                        addr = %entry.addrs.tcp,
                        error = %e,
                        "Failed to publish message to node, trying next node."
                    );
                    self.statistics
                        .num_failed_attempts
                        .fetch_add(1, Ordering::Relaxed);
                },
            }
        }

        error!(topic = topic, attempts = attempts, "All broker nodes failed to accept the message.");
        Err(PublishError::Exhausted { attempts })
    }
}
