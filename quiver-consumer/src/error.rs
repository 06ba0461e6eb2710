use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("Invalid configuration: {0}")]
    /// The provided configuration cannot be used to start the consumer.
    Config(String),

    #[error("Failed to subscribe: {0}")]
    /// The broker client could not set up the subscription.
    Subscriber(#[from] anyhow::Error),
}
