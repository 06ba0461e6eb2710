use std::net::{Ipv4Addr, SocketAddr, TcpListener};

/// Gets a loopback address allocated by the OS which nothing is listening on.
///
/// The listener is released before returning, connections to the address
/// are refused.
pub fn get_unused_addr() -> SocketAddr {
    TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .and_then(|listener| listener.local_addr())
        .expect("Allocate loopback address")
}

/// A `host:port` endpoint which refuses every connection, for standing in
/// for a directory or broker node which is down.
pub fn unreachable_endpoint() -> String {
    get_unused_addr().to_string()
}
