use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::address::{AddressError, NodeAddresses};

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
/// The body returned by the directory's `GET /nodes` endpoint.
pub struct NodeList {
    /// The broker nodes known to the directory.
    ///
    /// Records which cannot be decoded are logged and left out rather than
    /// failing the whole list.
    #[serde(default, deserialize_with = "decode_producers")]
    pub producers: Vec<DiscoveredNode>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// A broker node as reported by a directory endpoint.
///
/// These are rebuilt on every poll of the directory and never persisted.
pub struct DiscoveredNode {
    /// The address the directory observed the node connecting from.
    ///
    /// This may be the loopback address if the node is co-located with
    /// the directory.
    #[serde(deserialize_with = "null_as_default")]
    pub remote_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub host_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub broadcast_address: String,
    /// The advertised data-plane port.
    #[serde(deserialize_with = "null_as_default")]
    pub tcp_port: u16,
    /// The advertised admin port.
    #[serde(deserialize_with = "null_as_default")]
    pub http_port: u16,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    /// The topics the node currently holds, informational only.
    #[serde(deserialize_with = "null_as_default")]
    pub topics: Vec<String>,
}

impl DiscoveredNode {
    /// Resolves the endpoints of this node as seen from the directory endpoint
    /// which reported it.
    pub fn addresses(&self, directory: &str) -> Result<NodeAddresses, AddressError> {
        NodeAddresses::resolve(
            &self.remote_address,
            self.tcp_port,
            self.http_port,
            directory,
        )
    }
}

/// Decodes each producer record on its own so one bad record only costs
/// that record.
fn decode_producers<'de, D>(deserializer: D) -> Result<Vec<DiscoveredNode>, D::Error>
where
    D: Deserializer<'de>,
{
    let records: Vec<Value> = null_as_default(deserializer)?;

    let producers = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(node) => Some(node),
            Err(e) => {
                error!(error = %e, "Directory reported an undecodable node record, ignoring node.");
                None
            },
        })
        .collect();

    Ok(producers)
}

/// Treats an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
