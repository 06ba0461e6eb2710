use std::time::Duration;

use quiver_lookup::DEFAULT_REQUEST_TIMEOUT;

#[derive(Debug, Clone)]
/// Configuration for subscribing to topics.
pub struct ConsumerConfig {
    /// The directory endpoints (`host:port`) the broker client discovers
    /// the broker nodes from.
    pub directory_addresses: Vec<String>,

    /// The timeout applied to each topic creation request.
    pub request_timeout: Duration,
}

impl ConsumerConfig {
    /// Creates a new consumer config.
    pub fn new(directory_addresses: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            directory_addresses: directory_addresses
                .into_iter()
                .map(|addr| addr.as_ref().to_string())
                .collect(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the timeout applied to each topic creation request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
