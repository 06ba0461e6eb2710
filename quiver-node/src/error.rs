use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Invalid configuration: {0}")]
    /// The provided configuration cannot be used to start the producer.
    Config(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("No broker nodes are currently available to publish to.")]
    /// The pool was empty at the time of publishing.
    NoNodes,

    #[error("Every broker node was tried ({attempts} attempts) and none accepted the message.")]
    /// Every candidate in the pool was either still warming up or failed
    /// to accept the message.
    Exhausted { attempts: usize },
}
