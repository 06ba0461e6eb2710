use std::sync::Arc;

use futures::future;
use quiver_lookup::DirectoryClient;
use quiver_node::ProducerHandle;

use crate::config::ConsumerConfig;
use crate::error::SubscribeError;
use crate::message::Message;
use crate::registry::{MessageHandler, TopicHandlerRegistry};
use crate::subscriber::{channel_name, Delivery, Subscriber, Subscription};

/// Build a consumer using the provided settings.
pub struct ConsumerBuilder {
    config: ConsumerConfig,
    subscriber: Arc<dyn Subscriber>,
    producer: Option<ProducerHandle>,
}

impl ConsumerBuilder {
    /// Create a new consumer builder.
    ///
    /// The subscriber is the broker client which attaches to the topics.
    pub fn new<S>(config: ConsumerConfig, subscriber: S) -> Self
    where
        S: Subscriber,
    {
        Self {
            config,
            subscriber: Arc::new(subscriber),
            producer: None,
        }
    }

    /// Attach the topology of a running producer.
    ///
    /// The broker nodes it knows about are used to create topics ahead of
    /// subscribing and to size the in-flight window.
    pub fn with_producer(mut self, producer: ProducerHandle) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Validates the configuration and creates the consumer.
    pub fn build(self) -> Result<Consumer, SubscribeError> {
        if self.config.directory_addresses.is_empty() {
            error!("No directory addresses provided, cannot subscribe to topics.");
            return Err(SubscribeError::Config(
                "At least one directory address must be provided.".to_string(),
            ));
        }

        Ok(Consumer {
            directory: DirectoryClient::new(self.config.request_timeout),
            directory_addresses: Arc::new(self.config.directory_addresses),
            subscriber: self.subscriber,
            producer: self.producer,
            registry: TopicHandlerRegistry::default(),
        })
    }
}

#[derive(Clone)]
/// Subscribes to topics and routes their messages to the registered handlers.
pub struct Consumer {
    directory: DirectoryClient,
    directory_addresses: Arc<Vec<String>>,
    subscriber: Arc<dyn Subscriber>,
    producer: Option<ProducerHandle>,
    registry: TopicHandlerRegistry,
}

impl Consumer {
    /// Subscribes the handler to the topic.
    ///
    /// The topic is created on every broker node currently known, the handler
    /// is registered and the subscription is handed to the broker client.
    /// Subscribing a second handler to the same topic replaces the first.
    ///
    /// If the broker client fails to subscribe the error is returned, the
    /// handler remains registered.
    pub async fn subscribe<H>(
        &self,
        channel: &str,
        topic: &str,
        handler: H,
        ephemeral: bool,
    ) -> Result<(), SubscribeError>
    where
        H: MessageHandler,
    {
        self.create_topic(topic).await;
        self.registry.register(topic, handler);

        let subscription = Subscription {
            topic: topic.to_string(),
            channel: channel_name(channel, ephemeral),
            max_in_flight: self.max_in_flight(),
            directory_addresses: self.directory_addresses.as_ref().clone(),
        };
        let delivery = Delivery::new(topic.to_string(), self.registry.clone());

        info!(
            topic = topic,
            channel = %subscription.channel,
            max_in_flight = subscription.max_in_flight,
            "Subscribing to topic."
        );

        if let Err(e) = self.subscriber.subscribe(subscription, delivery).await {
            error!(topic = topic, channel = channel, error = %e, "Failed to subscribe to topic.");
            return Err(e);
        }

        Ok(())
    }

    /// Passes a received message to the handler registered for the topic.
    ///
    /// See [TopicHandlerRegistry::dispatch].
    pub fn dispatch(&self, topic: &str, msg: &Message) -> bool {
        self.registry.dispatch(topic, msg)
    }

    #[inline]
    /// Get access to the topic handler registry.
    pub fn registry(&self) -> &TopicHandlerRegistry {
        &self.registry
    }

    /// The number of messages a subscription may have in flight.
    ///
    /// One per known broker node plus one.
    pub fn max_in_flight(&self) -> usize {
        self.producer
            .as_ref()
            .map(|producer| producer.num_nodes())
            .unwrap_or_default()
            + 1
    }

    /// Creates the topic on every known broker node.
    ///
    /// Failures are logged and ignored, broker nodes create topics on first
    /// use anyway.
    async fn create_topic(&self, topic: &str) {
        let producer = match self.producer.as_ref() {
            Some(producer) => producer,
            None => return,
        };

        let admin_addresses = producer.admin_addresses();
        debug!(topic = topic, num_nodes = admin_addresses.len(), "Creating topic.");

        let requests = admin_addresses
            .iter()
            .map(|addr| self.directory.create_topic(addr, topic));
        future::join_all(requests).await;
    }
}
