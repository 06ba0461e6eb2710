use async_trait::async_trait;

use crate::error::SubscribeError;
use crate::message::Message;
use crate::registry::TopicHandlerRegistry;

/// Appended to the channel name of subscriptions the broker should discard
/// once the consumer disconnects.
pub const EPHEMERAL_SUFFIX: &str = "#ephemeral";

/// Produces the channel name the broker knows the subscription by.
pub fn channel_name(channel: &str, ephemeral: bool) -> String {
    if ephemeral && !channel.ends_with(EPHEMERAL_SUFFIX) {
        format!("{channel}{EPHEMERAL_SUFFIX}")
    } else {
        channel.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The settings the broker client needs to attach to a topic.
pub struct Subscription {
    /// The topic to consume from.
    pub topic: String,
    /// The channel name, including the ephemeral suffix if set.
    pub channel: String,
    /// The number of messages the broker client may have in flight at once.
    pub max_in_flight: usize,
    /// The directory endpoints to discover the broker nodes from.
    pub directory_addresses: Vec<String>,
}

impl Subscription {
    #[inline]
    /// Returns if the broker discards the channel once the consumer disconnects.
    pub fn is_ephemeral(&self) -> bool {
        self.channel.ends_with(EPHEMERAL_SUFFIX)
    }
}

#[derive(Clone)]
/// The delivery callback for a single subscription.
///
/// The broker client should call [Delivery::deliver] once for every message
/// it receives on the subscription.
pub struct Delivery {
    topic: String,
    registry: TopicHandlerRegistry,
}

impl Delivery {
    pub(crate) fn new(topic: String, registry: TopicHandlerRegistry) -> Self {
        Self { topic, registry }
    }

    #[inline]
    /// The topic this delivery is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Passes the message to the handler registered for the topic.
    ///
    /// Returns `false` if there was no handler and the message was dropped.
    pub fn deliver(&self, msg: &Message) -> bool {
        self.registry.dispatch(&self.topic, msg)
    }
}

#[async_trait]
/// The broker client side of a subscription.
///
/// Implementations connect to the broker nodes serving the topic and route
/// each received message through the provided [Delivery].
pub trait Subscriber: Send + Sync + 'static {
    async fn subscribe(
        &self,
        subscription: Subscription,
        delivery: Delivery,
    ) -> Result<(), SubscribeError>;
}
