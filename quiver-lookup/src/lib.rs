//! # Quiver Lookup
//!
//! A small client for the directory service which keeps track of the broker
//! nodes currently alive in the cluster.
//!
//! The directory is queried with `GET /nodes` and answers with the set of
//! producers (broker nodes) it knows about, each of these records is turned
//! into a pair of [NodeAddresses], the data-plane address used to publish
//! messages and the admin address used for management calls like
//! `POST /topic/create`.
//!
//! None of the calls in this crate are fatal to the caller, an unreachable
//! directory simply yields no new information.

#[macro_use]
extern crate tracing;

mod address;
mod client;
mod error;
mod node;

use std::time::Duration;

pub use address::{directory_host, AddressError, NodeAddress, NodeAddresses, LOOPBACK_HOST};
pub use client::DirectoryClient;
pub use error::LookupError;
pub use node::{DiscoveredNode, NodeList};

/// The timeout applied to every outbound HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
