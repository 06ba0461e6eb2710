use std::time::Duration;

use hyper::StatusCode;
use quiver_lookup::{DirectoryClient, LookupError, NodeAddress};
use test_helper::{get_unused_addr, producer, unreachable_endpoint, MockDirectory};

#[tokio::test]
async fn test_list_nodes() {
    let _ = tracing_subscriber::fmt::try_init();

    let directory = MockDirectory::start().await;
    directory.set_producers(vec![
        producer("127.0.0.1:9999", 4150, 4151),
        producer("10.0.0.9:41822", 5150, 5151),
    ]);

    let client = DirectoryClient::default();
    let nodes = client.list_nodes(&directory.address()).await;
    assert_eq!(nodes.len(), 2);

    let addrs = nodes[0]
        .addresses("10.0.0.5:4161")
        .expect("Resolve addresses");
    assert_eq!(addrs.tcp.to_string(), "10.0.0.5:4150");
    assert_eq!(addrs.http.to_string(), "10.0.0.5:4151");

    let addrs = nodes[1]
        .addresses(&directory.address())
        .expect("Resolve addresses");
    assert_eq!(addrs.tcp, NodeAddress::new("10.0.0.9", 5150));
}

#[tokio::test]
async fn test_list_nodes_skips_undecodable_records() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut null_topics = producer("10.0.0.1:41000", 4150, 4151);
    null_topics["topics"] = serde_json::Value::Null;
    let mut bad_port = producer("10.0.0.2:41000", 4150, 4151);
    bad_port["http_port"] = serde_json::json!(70000);

    let directory = MockDirectory::start().await;
    directory.set_producers(vec![
        null_topics,
        bad_port,
        producer("10.0.0.3:41000", 4150, 4151),
    ]);

    let client = DirectoryClient::default();
    let nodes = client.list_nodes(&directory.address()).await;
    let remotes = nodes
        .iter()
        .map(|node| node.remote_address.as_str())
        .collect::<Vec<_>>();
    assert_eq!(remotes, vec!["10.0.0.1:41000", "10.0.0.3:41000"]);
}

#[tokio::test]
async fn test_list_nodes_bad_status_is_empty() {
    let _ = tracing_subscriber::fmt::try_init();

    let directory = MockDirectory::start().await;
    directory.set_response(StatusCode::INTERNAL_SERVER_ERROR, "oops");

    let client = DirectoryClient::default();
    assert!(client.list_nodes(&directory.address()).await.is_empty());

    let err = client
        .try_list_nodes(&directory.address())
        .await
        .expect_err("Request should fail");
    assert!(matches!(err, LookupError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
}

#[tokio::test]
async fn test_list_nodes_malformed_body_is_empty() {
    let _ = tracing_subscriber::fmt::try_init();

    let directory = MockDirectory::start().await;
    directory.set_response(StatusCode::OK, "{\"producers\": [");

    let client = DirectoryClient::default();
    assert!(client.list_nodes(&directory.address()).await.is_empty());

    let err = client
        .try_list_nodes(&directory.address())
        .await
        .expect_err("Request should fail");
    assert!(matches!(err, LookupError::Decode(_)));
}

#[tokio::test]
async fn test_list_nodes_unreachable_is_empty() {
    let _ = tracing_subscriber::fmt::try_init();

    let directory = unreachable_endpoint();
    let client = DirectoryClient::default();
    assert!(client.list_nodes(&directory).await.is_empty());

    let err = client
        .try_list_nodes(&directory)
        .await
        .expect_err("Request should fail");
    assert!(matches!(err, LookupError::Http(_)));
}

#[tokio::test]
async fn test_list_nodes_timeout() {
    let _ = tracing_subscriber::fmt::try_init();

    let directory = MockDirectory::start().await;
    directory.set_producers(vec![producer("127.0.0.1:9999", 4150, 4151)]);
    directory.set_delay(Some(Duration::from_secs(2)));

    let client = DirectoryClient::new(Duration::from_millis(100));
    let err = client
        .try_list_nodes(&directory.address())
        .await
        .expect_err("Request should time out");
    assert!(matches!(err, LookupError::Timeout(_)));
    assert!(client.list_nodes(&directory.address()).await.is_empty());
}

#[tokio::test]
async fn test_create_topic() {
    let _ = tracing_subscriber::fmt::try_init();

    let directory = MockDirectory::start().await;
    let addr = NodeAddress::new("127.0.0.1", directory.addr().port());

    let client = DirectoryClient::default();
    client
        .try_create_topic(&addr, "orders")
        .await
        .expect("Create topic");
    client.create_topic(&addr, "payments").await;

    assert_eq!(
        directory.created_topics(),
        vec!["orders".to_string(), "payments".to_string()],
    );
}

#[tokio::test]
async fn test_create_topic_failure_is_ignored() {
    let _ = tracing_subscriber::fmt::try_init();

    let addr = get_unused_addr();
    let addr = NodeAddress::new("127.0.0.1", addr.port());

    let client = DirectoryClient::default();
    client.create_topic(&addr, "orders").await;
    assert!(client.try_create_topic(&addr, "orders").await.is_err());
}
