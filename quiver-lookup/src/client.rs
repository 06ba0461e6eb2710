use std::fmt::Write;
use std::time::Duration;

use hyper::body::Bytes;
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request, StatusCode, Uri};
use tokio::time::timeout;

use crate::address::NodeAddress;
use crate::error::LookupError;
use crate::node::{DiscoveredNode, NodeList};
use crate::DEFAULT_REQUEST_TIMEOUT;

#[derive(Clone)]
/// A HTTP client for the directory service and the admin endpoints of
/// broker nodes.
///
/// This is cheap to clone, the underlying connection pool is shared.
pub struct DirectoryClient {
    client: Client<HttpConnector>,
    request_timeout: Duration,
}

impl Default for DirectoryClient {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl DirectoryClient {
    /// Creates a new client which aborts any request taking longer
    /// than `request_timeout`.
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            client: Client::builder().build_http(),
            request_timeout,
        }
    }

    #[inline]
    /// The timeout applied to each request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Lists the broker nodes known to the given directory endpoint.
    ///
    /// Any failure is logged and an empty list is returned, an unreachable
    /// directory provides no new information rather than an error.
    pub async fn list_nodes(&self, directory: &str) -> Vec<DiscoveredNode> {
        match self.try_list_nodes(directory).await {
            Ok(list) => {
                trace!(
                    directory = directory,
                    num_nodes = list.producers.len(),
                    "Listed nodes from directory."
                );
                list.producers
            },
            Err(e) => {
                error!(directory = directory, error = %e, "Failed to list nodes from directory.");
                Vec::new()
            },
        }
    }

    /// Lists the broker nodes known to the given directory endpoint.
    pub async fn try_list_nodes(&self, directory: &str) -> Result<NodeList, LookupError> {
        let uri = format!("http://{}/nodes", directory).parse::<Uri>()?;
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())?;

        let (status, body) = self.send(request).await?;
        if status != StatusCode::OK {
            return Err(LookupError::Status(status));
        }

        let list = serde_json::from_slice(&body)?;
        Ok(list)
    }

    /// Registers a topic with the broker node behind the given admin address.
    ///
    /// Brokers create topics on first use so this is purely an optimisation,
    /// failures are logged and otherwise ignored.
    pub async fn create_topic(&self, addr: &NodeAddress, topic: &str) {
        match self.try_create_topic(addr, topic).await {
            Ok(()) => debug!(addr = %addr, topic = topic, "Created topic on node."),
            Err(e) => warn!(addr = %addr, topic = topic, error = %e, "Failed to create topic on node."),
        }
    }

    /// Registers a topic with the broker node behind the given admin address.
    pub async fn try_create_topic(
        &self,
        addr: &NodeAddress,
        topic: &str,
    ) -> Result<(), LookupError> {
        let uri = format!("http://{}/topic/create?topic={}", addr, encode_query(topic))
            .parse::<Uri>()?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::empty())?;

        let (status, _) = self.send(request).await?;
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        Ok(())
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Bytes), LookupError> {
        let fut = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            let body = hyper::body::to_bytes(response.into_body()).await?;
            Ok::<_, LookupError>((status, body))
        };

        timeout(self.request_timeout, fut)
            .await
            .map_err(|_| LookupError::Timeout(self.request_timeout))?
    }
}

/// Percent-encodes a value for use within a query string.
fn encode_query(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            },
            _ => {
                let _ = write!(encoded, "%{:02X}", byte);
            },
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_query() {
        assert_eq!(encode_query("orders"), "orders");
        assert_eq!(encode_query("orders.v1_eu-west"), "orders.v1_eu-west");
        assert_eq!(encode_query("orders#ephemeral"), "orders%23ephemeral");
        assert_eq!(encode_query("a b&c"), "a%20b%26c");
    }
}
