use std::time::Duration;

use quiver_lookup::DEFAULT_REQUEST_TIMEOUT;

/// The default delay before a newly admitted node is used for publishing.
///
/// This matches the default interval consumers poll the directory at.
pub const DEFAULT_PROPAGATION_INTERVAL: Duration = Duration::from_secs(30);
/// The default bound on a graceful connection shutdown during eviction.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
/// Configuration for discovering and publishing to the broker nodes.
pub struct ProducerConfig {
    /// The directory endpoints (`host:port`) to discover broker nodes from.
    ///
    /// At least one endpoint is required. A node may be reported by several
    /// directories, it is only connected to once.
    pub directory_addresses: Vec<String>,

    /// The number of seconds between each discovery poll.
    ///
    /// A value of `0` or less disables re-polling, the node set discovered
    /// when connecting is then used for the lifetime of the producer.
    pub poll_interval_secs: i64,

    /// How long a newly discovered node is left to warm up before it is
    /// used for publishing.
    ///
    /// Consumers discover nodes independently, publishing to a fresh node
    /// before they have attached to it risks the message sitting unread.
    /// This should be at least the directory poll interval of the consumers.
    pub propagation_interval: Duration,

    /// The timeout applied to each directory request.
    pub request_timeout: Duration,

    /// The maximum time to wait for an evicted connection to stop.
    pub shutdown_timeout: Duration,
}

impl ProducerConfig {
    /// Creates a new producer config.
    pub fn new(
        directory_addresses: impl IntoIterator<Item = impl AsRef<str>>,
        poll_interval_secs: i64,
    ) -> Self {
        Self {
            directory_addresses: directory_addresses
                .into_iter()
                .map(|addr| addr.as_ref().to_string())
                .collect(),
            poll_interval_secs,
            propagation_interval: DEFAULT_PROPAGATION_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the warm-up delay applied to newly discovered nodes.
    pub fn with_propagation_interval(mut self, interval: Duration) -> Self {
        self.propagation_interval = interval;
        self
    }

    /// Set the timeout applied to each directory request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the maximum time to wait for an evicted connection to stop.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// The re-poll period, if re-polling is enabled.
    pub fn poll_interval(&self) -> Option<Duration> {
        if self.poll_interval_secs > 0 {
            Some(Duration::from_secs(self.poll_interval_secs as u64))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval() {
        let cfg = ProducerConfig::new(["127.0.0.1:4161"], 3);
        assert_eq!(cfg.poll_interval(), Some(Duration::from_secs(3)));
        assert_eq!(cfg.propagation_interval, DEFAULT_PROPAGATION_INTERVAL);

        let cfg = ProducerConfig::new(["127.0.0.1:4161"], 0);
        assert_eq!(cfg.poll_interval(), None);

        let cfg = ProducerConfig::new(["127.0.0.1:4161"], -5);
        assert_eq!(cfg.poll_interval(), None);
    }
}
