//! # Quiver Node
//!
//! Keeps a live pool of connections to the broker nodes of a cluster whose
//! membership changes over time, and load balances published messages across
//! that pool.
//!
//! Broker nodes are discovered by periodically polling one or more directory
//! endpoints. Nodes which newly appear are connected to and admitted to the
//! pool, nodes which are no longer reported by any directory are evicted and
//! their connection stopped.
//!
//! A freshly admitted node is not used for publishing until the configured
//! propagation interval has elapsed, consumers discover nodes independently
//! and may not have attached to it yet. The very first nodes admitted to an
//! empty pool are exempt from this as there is nothing else to publish to.

#[macro_use]
extern crate tracing;

mod config;
mod connection;
mod error;
mod pool;
mod statistics;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod tracker;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future;
pub use config::{ProducerConfig, DEFAULT_PROPAGATION_INTERVAL, DEFAULT_SHUTDOWN_TIMEOUT};
pub use connection::{Connection, ConnectionError, Connector, PublishMode};
pub use error::{NodeError, PublishError};
pub use pool::{PoolEntry, PublisherPool};
use quiver_lookup::DirectoryClient;
pub use quiver_lookup::{NodeAddress, NodeAddresses};
pub use statistics::PoolStatistics;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::tracker::{run_tracker, TopologyTracker};

/// Build a producer using the provided settings.
pub struct ProducerBuilder {
    config: ProducerConfig,
    connector: Arc<dyn Connector>,
}

impl ProducerBuilder {
    /// Create a new producer builder.
    ///
    /// The connector is used to open a connection to each broker node
    /// as it is discovered.
    pub fn new<C>(config: ProducerConfig, connector: C) -> Self
    where
        C: Connector,
    {
        Self {
            config,
            connector: Arc::new(connector),
        }
    }

    /// Discovers the broker nodes and starts tracking the cluster topology.
    ///
    /// The first discovery round completes before this returns, so any nodes
    /// reachable at this point can be published to immediately.
    ///
    /// Directory endpoints do not need to be reachable at the time of
    /// connecting, nodes are picked up on a later poll once they are.
    pub async fn connect(self) -> Result<Producer, NodeError> {
        if self.config.directory_addresses.is_empty() {
            error!("No directory addresses provided, cannot discover broker nodes.");
            return Err(NodeError::Config(
                "At least one directory address must be provided.".to_string(),
            ));
        }

        let pool = PublisherPool::new(PoolStatistics::default());
        let (changes_tx, changes) = watch::channel(TopologyChange::default());

        let tracker = Arc::new(TopologyTracker::new(
            DirectoryClient::new(self.config.request_timeout),
            self.config.directory_addresses.clone(),
            self.connector,
            pool.clone(),
            self.config.propagation_interval,
            self.config.shutdown_timeout,
            changes_tx,
        ));

        tracker.poll().await;

        let cancel = CancellationToken::new();
        let task = match self.config.poll_interval() {
            Some(poll_interval) => Some(tokio::spawn(run_tracker(
                tracker.clone(),
                poll_interval,
                cancel.clone(),
            ))),
            None => {
                error!(
                    poll_interval_secs = self.config.poll_interval_secs,
                    "Poll interval is not positive, broker nodes will not be re-polled."
                );
                None
            },
        };

        info!(
            directories = %self.config.directory_addresses.join(", "),
            poll_interval_secs = self.config.poll_interval_secs,
            num_nodes = pool.len(),
            "Producer connected."
        );

        Ok(Producer {
            handle: ProducerHandle { pool, changes },
            tracker,
            cancel,
            task,
            shutdown_timeout: self.config.shutdown_timeout,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// The nodes which joined and left the pool during a discovery round.
pub struct TopologyChange {
    pub joined: Vec<NodeAddresses>,
    pub left: Vec<NodeAddresses>,
}

impl TopologyChange {
    #[inline]
    /// Returns if no nodes joined or left.
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// A running producer.
///
/// Dropping the producer stops the discovery loop but leaves connections
/// to be closed by the broker client, use [Producer::shutdown] to stop
/// them gracefully.
pub struct Producer {
    handle: ProducerHandle,
    tracker: Arc<TopologyTracker>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl Producer {
    /// Stops the discovery loop and gracefully stops every connection.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = ?e, "Topology tracker exited abnormally.");
            }
        }

        let entries = self.handle.pool.drain();
        let shutdown_timeout = self.shutdown_timeout;
        let stops = entries.iter().map(|entry| async move {
            if timeout(shutdown_timeout, entry.connection().stop())
                .await
                .is_err()
            {
                warn!(
                    addr = %entry.addrs().tcp,
                    timeout = ?shutdown_timeout,
                    "Connection did not stop within the shutdown timeout."
                );
            }
        });
        future::join_all(stops).await;

        info!("Producer shut down.");
    }

    #[inline]
    /// Creates a cheap to clone handle for publishing messages.
    pub fn handle(&self) -> ProducerHandle {
        self.handle.clone()
    }

    #[inline]
    /// Publishes a message to one of the broker nodes.
    ///
    /// See [PublisherPool::publish].
    pub async fn publish(
        &self,
        topic: &str,
        body: impl Into<Bytes>,
        mode: PublishMode,
    ) -> Result<(), PublishError> {
        self.handle.publish(topic, body, mode).await
    }

    #[inline]
    /// The number of broker nodes currently in the pool.
    pub fn num_nodes(&self) -> usize {
        self.handle.num_nodes()
    }

    #[inline]
    /// Gets the live pool statistics.
    pub fn statistics(&self) -> PoolStatistics {
        self.handle.statistics()
    }

    #[inline]
    /// Get access to the publisher pool.
    pub fn pool(&self) -> &PublisherPool {
        &self.handle.pool
    }

    #[inline]
    /// Get a stream of topology changes.
    pub fn topology_changes(&self) -> WatchStream<TopologyChange> {
        self.handle.topology_changes()
    }

    /// Runs a discovery round immediately.
    ///
    /// If a round is already in progress this waits for it to complete
    /// before starting another.
    pub async fn poll_now(&self) -> TopologyChange {
        self.tracker.poll().await
    }

    /// Waits until the pool holds exactly `num_nodes` broker nodes.
    pub async fn wait_for_nodes(
        &self,
        num_nodes: usize,
        timeout_after: Duration,
    ) -> Result<(), anyhow::Error> {
        let mut changes = self.topology_changes();
        timeout(timeout_after, async {
            while self.num_nodes() != num_nodes {
                if changes.next().await.is_none() {
                    anyhow::bail!("The topology tracker has stopped.");
                }
            }
            Ok(())
        })
        .await?
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Clone)]
/// A handle to a running producer.
pub struct ProducerHandle {
    pool: PublisherPool,
    changes: watch::Receiver<TopologyChange>,
}

impl ProducerHandle {
    /// Publishes a message to one of the broker nodes.
    ///
    /// See [PublisherPool::publish].
    pub async fn publish(
        &self,
        topic: &str,
        body: impl Into<Bytes>,
        mode: PublishMode,
    ) -> Result<(), PublishError> {
        self.pool.publish(topic, body.into(), mode).await
    }

    #[inline]
    /// The number of broker nodes currently in the pool.
    pub fn num_nodes(&self) -> usize {
        self.pool.len()
    }

    #[inline]
    /// The admin addresses of every broker node in the pool.
    pub fn admin_addresses(&self) -> BTreeSet<NodeAddress> {
        self.pool.admin_addresses()
    }

    #[inline]
    /// The data-plane addresses of every broker node in the pool.
    pub fn data_addresses(&self) -> BTreeSet<NodeAddress> {
        self.pool.data_addresses()
    }

    #[inline]
    /// Gets the live pool statistics.
    pub fn statistics(&self) -> PoolStatistics {
        self.pool.statistics().clone()
    }

    #[inline]
    /// Get access to the publisher pool.
    pub fn pool(&self) -> &PublisherPool {
        &self.pool
    }

    #[inline]
    /// Get a stream of topology changes.
    pub fn topology_changes(&self) -> WatchStream<TopologyChange> {
        WatchStream::new(self.changes.clone())
    }
}
