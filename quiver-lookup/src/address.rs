use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

/// The host reported by broker nodes which do not know their externally
/// reachable address.
pub static LOOPBACK_HOST: &str = "127.0.0.1";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address `{0}` is not in the form `host:port`.")]
    /// The address did not contain exactly one separator between host and port.
    Malformed(String),

    #[error("Address `{0}` does not contain a valid port.")]
    /// The port component of the address could not be parsed.
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// A `host:port` pair identifying a single endpoint of a broker node.
///
/// No other identity is assumed for a node, two nodes reporting the same
/// address are the same node.
pub struct NodeAddress {
    host: String,
    port: u16,
}

impl NodeAddress {
    /// Creates a new address from its components.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    #[inline]
    /// The host component of the address.
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    /// The port component of the address.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Display for NodeAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for NodeAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = split_host_port(s)?;
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressError::InvalidPort(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// The data-plane and admin endpoints of one broker node.
pub struct NodeAddresses {
    /// The address messages are published to.
    pub tcp: NodeAddress,
    /// The administrative HTTP endpoint of the node.
    pub http: NodeAddress,
}

impl NodeAddresses {
    /// Resolves the endpoints of a node from the remote address the
    /// directory observed it connecting from and its advertised ports.
    ///
    /// If the remote host is the loopback literal it is replaced with the host
    /// of the directory endpoint which reported the node.
    pub fn resolve(
        remote_address: &str,
        tcp_port: u16,
        http_port: u16,
        directory: &str,
    ) -> Result<Self, AddressError> {
        let (host, _) = split_host_port(remote_address)?;
        let host = if host == LOOPBACK_HOST {
            directory_host(directory)
        } else {
            host
        };

        Ok(Self {
            tcp: NodeAddress::new(host, tcp_port),
            http: NodeAddress::new(host, http_port),
        })
    }
}

impl Display for NodeAddresses {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tcp://{} http://{}", self.tcp, self.http)
    }
}

/// Gets the host component of a directory endpoint address.
pub fn directory_host(directory: &str) -> &str {
    match directory.split_once(':') {
        Some((host, _)) => host,
        None => directory,
    }
}

fn split_host_port(addr: &str) -> Result<(&str, &str), AddressError> {
    let mut parts = addr.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(host), Some(port), None) => Ok((host, port)),
        _ => Err(AddressError::Malformed(addr.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_is_rewritten_to_directory_host() {
        let addrs =
            NodeAddresses::resolve("127.0.0.1:9999", 4150, 4151, "10.0.0.5:4161")
                .expect("Resolve addresses");

        assert_eq!(addrs.tcp.to_string(), "10.0.0.5:4150");
        assert_eq!(addrs.http.to_string(), "10.0.0.5:4151");
    }

    #[test]
    fn test_remote_host_is_kept() {
        let addrs =
            NodeAddresses::resolve("192.168.1.20:53122", 4150, 4151, "10.0.0.5:4161")
                .expect("Resolve addresses");

        assert_eq!(addrs.tcp, NodeAddress::new("192.168.1.20", 4150));
        assert_eq!(addrs.http, NodeAddress::new("192.168.1.20", 4151));
    }

    #[test]
    fn test_malformed_remote_address() {
        for addr in ["192.168.1.20", "::1:4150", "a:b:c", ""] {
            let err = NodeAddresses::resolve(addr, 4150, 4151, "10.0.0.5:4161")
                .expect_err("Address should be rejected");
            assert_eq!(err, AddressError::Malformed(addr.to_string()));
        }
    }

    #[test]
    fn test_directory_host() {
        assert_eq!(directory_host("10.0.0.5:4161"), "10.0.0.5");
        assert_eq!(directory_host("lookupd"), "lookupd");
    }

    #[test]
    fn test_parse_node_address() {
        let addr = "10.0.0.5:4150".parse::<NodeAddress>().unwrap();
        assert_eq!(addr.host(), "10.0.0.5");
        assert_eq!(addr.port(), 4150);

        assert!(matches!(
            "10.0.0.5:http".parse::<NodeAddress>(),
            Err(AddressError::InvalidPort(_))
        ));
    }
}
