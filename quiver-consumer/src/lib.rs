//! # Quiver Consumer
//!
//! Routes the messages received from the broker nodes to the handler
//! registered for their topic.
//!
//! The broker client itself is plugged in via the [Subscriber] trait, for
//! every subscription it is handed a [Delivery] which it calls once per
//! received message. Each topic has exactly one handler, registering another
//! replaces it.

#[macro_use]
extern crate tracing;

mod config;
mod consumer;
mod error;
mod message;
mod registry;
mod subscriber;

pub use config::ConsumerConfig;
pub use consumer::{Consumer, ConsumerBuilder};
pub use error::SubscribeError;
pub use message::{Message, MessageId, MESSAGE_ID_LEN};
pub use registry::{MessageHandler, TopicHandlerRegistry};
pub use subscriber::{channel_name, Delivery, Subscriber, Subscription, EPHEMERAL_SUFFIX};
