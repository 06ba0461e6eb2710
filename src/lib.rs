//! # Quiver
//! Client side tooling for message broker clusters whose nodes come and go.
//!
//! This is a convenience package which includes all of the sub-projects within
//! Quiver, realistically you probably only want some of these projects:
//!
//! ### Features
//! - `quiver_lookup` - A client for the directory service broker nodes register with.
//! - `quiver_node` - Tracks the live broker nodes and load balances published messages across them.
//! - `quiver_consumer` - Routes received messages to the handler registered for their topic.

#[cfg(feature = "quiver-consumer")]
pub use quiver_consumer as consumer;
#[cfg(feature = "quiver-lookup")]
pub use quiver_lookup as lookup;
#[cfg(feature = "quiver-node")]
pub use quiver_node as node;
