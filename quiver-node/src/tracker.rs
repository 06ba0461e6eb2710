use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use quiver_lookup::{DirectoryClient, NodeAddress, NodeAddresses};
use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::connection::{Connection, Connector};
use crate::pool::{PoolEntry, PublisherPool};
use crate::TopologyChange;

/// Stands in for deadlines too far out to be represented.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// The instant `delay` after `now`, saturating at a far future instant.
pub(crate) fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Discovers the broker nodes reported by the directory endpoints and keeps
/// the publisher pool in line with them.
pub(crate) struct TopologyTracker {
    directory: DirectoryClient,
    directory_addresses: Vec<String>,
    connector: Arc<dyn Connector>,
    pool: PublisherPool,
    propagation_interval: Duration,
    shutdown_timeout: Duration,
    changes_tx: watch::Sender<TopologyChange>,
    poll_lock: Mutex<()>,
}

impl TopologyTracker {
    pub(crate) fn new(
        directory: DirectoryClient,
        directory_addresses: Vec<String>,
        connector: Arc<dyn Connector>,
        pool: PublisherPool,
        propagation_interval: Duration,
        shutdown_timeout: Duration,
        changes_tx: watch::Sender<TopologyChange>,
    ) -> Self {
        Self {
            directory,
            directory_addresses,
            connector,
            pool,
            propagation_interval,
            shutdown_timeout,
            changes_tx,
            poll_lock: Mutex::new(()),
        }
    }

    /// Runs a single discovery round.
    ///
    /// Nodes no longer reported by any directory are evicted and newly
    /// reported nodes are connected to and admitted. Only one round runs
    /// at a time.
    pub(crate) async fn poll(&self) -> TopologyChange {
        let _guard = self.poll_lock.lock().await;

        let reported = self.discover().await;
        let known = self.pool.data_addresses();
        debug!(
            num_reported = reported.len(),
            num_known = known.len(),
            "Polled directories for broker nodes."
        );

        let mut change = TopologyChange::default();

        for addr in known.iter().filter(|addr| !reported.contains_key(*addr)) {
            if let Some(entry) = self.pool.evict(addr) {
                info!(
                    tcp_addr = %entry.addrs().tcp,
                    http_addr = %entry.addrs().http,
                    "Node is no longer reported by any directory, evicting."
                );
                self.stop_connection(entry.connection().clone());
                change.left.push(entry.addrs().clone());
            }
        }

        // Nothing to fall back on while the pool is empty, so the first nodes
        // are usable straight away.
        let first_population = self.pool.is_empty();
        for addrs in reported.into_values() {
            if known.contains(&addrs.tcp) {
                continue;
            }

            let now = Instant::now();
            let ready_after = if first_population {
                now
            } else {
                deadline_after(now, self.propagation_interval)
            };

            if self.admit(addrs.clone(), ready_after).await {
                change.joined.push(addrs);
            }
        }

        if !change.is_empty() {
            let _ = self.changes_tx.send(change.clone());
        }

        change
    }

    /// Collects the nodes reported by every directory endpoint.
    ///
    /// A node reported by several endpoints is only included once.
    async fn discover(&self) -> BTreeMap<NodeAddress, NodeAddresses> {
        let mut reported = BTreeMap::new();

        for directory in self.directory_addresses.iter() {
            for node in self.directory.list_nodes(directory).await {
                match node.addresses(directory) {
                    Ok(addrs) => {
                        reported.entry(addrs.tcp.clone()).or_insert(addrs);
                    },
                    Err(e) => {
                        error!(
                            directory = %directory,
                            error = %e,
                            "Directory reported a malformed node, ignoring node."
                        );
                    },
                }
            }
        }

        reported
    }

    async fn admit(&self, addrs: NodeAddresses, ready_after: Instant) -> bool {
        let connection = match self.connector.connect(&addrs.tcp).await {
            Ok(connection) => connection,
            Err(e) => {
                error!(
                    tcp_addr = %addrs.tcp,
                    error = %e,
                    "Failed to connect to node, it will be retried next poll."
                );
                return false;
            },
        };

        let entry = PoolEntry::new(addrs.clone(), ready_after, connection.clone());
        if !self.pool.admit(entry) {
            self.stop_connection(connection);
            return false;
        }

        info!(
            tcp_addr = %addrs.tcp,
            http_addr = %addrs.http,
            warmup = ?ready_after.saturating_duration_since(Instant::now()),
            "Node has joined the pool."
        );

        true
    }

    /// Stops a connection in the background, giving up after the shutdown timeout.
    fn stop_connection(&self, connection: Arc<dyn Connection>) {
        let timeout_after = self.shutdown_timeout;
        tokio::spawn(async move {
            if timeout(timeout_after, connection.stop()).await.is_err() {
                warn!(
                    addr = %connection.addr(),
                    timeout = ?timeout_after,
                    "Connection did not stop within the shutdown timeout."
                );
            }
        });
    }
}

/// Polls the directories every `poll_interval` until cancelled.
pub(crate) async fn run_tracker(
    tracker: Arc<TopologyTracker>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let poll_interval = poll_interval.min(FAR_FUTURE);
    let mut interval = interval_at(deadline_after(Instant::now(), poll_interval), poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Received a stop signal. Stopping.");
                break;
            },
            _ = interval.tick() => {
                tracker.poll().await;
            },
        }
    }
}
