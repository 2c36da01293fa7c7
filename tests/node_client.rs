use super::*;

fn client(node: &MockNode) -> NodeClient {
    NodeClient::new(&node.server(), Some(("user".into(), "pass".into())))
        .unwrap()
        .with_template_retry(Duration::from_millis(10))
        .with_submit_retry(Duration::from_millis(10), 3)
}

/// Address of a port nothing listens on.
fn closed_server() -> String {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_template() {
    let node = MockNode::builder(regtest_template()).spawn().await;

    let raw = client(&node).fetch_template().await.unwrap();

    assert_eq!(raw.height, 300);
    assert_eq!(raw.transactions.len(), 2);
    assert_eq!(node.template_requests(), 1);

    // "user:pass"
    assert_eq!(node.authorization(), Some("Basic dXNlcjpwYXNz".into()));
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_template_retries_until_node_answers() {
    let node = MockNode::builder(regtest_template())
        .template_failures(3)
        .spawn()
        .await;

    let raw = client(&node).fetch_template().await.unwrap();

    assert_eq!(raw.height, 300);
    assert_eq!(node.template_requests(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_template_retries_unreachable_node() {
    let server = closed_server();

    let client = NodeClient::new(&server, None)
        .unwrap()
        .with_template_retry(Duration::from_millis(10));

    assert!(
        tokio::time::timeout(Duration::from_millis(500), client.fetch_template())
            .await
            .is_err()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_accepted() {
    let node = MockNode::builder(regtest_template()).spawn().await;

    assert!(client(&node).submit_block("00ff").await);
    assert_eq!(node.submissions(), ["00ff"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_rejected_is_not_retried() {
    let node = MockNode::builder(regtest_template())
        .submit_response(json!("high-hash"))
        .spawn()
        .await;

    assert!(!client(&node).submit_block("00ff").await);
    assert_eq!(node.submissions().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_gives_up_on_unreachable_node() {
    let server = closed_server();

    let client = NodeClient::new(&server, None)
        .unwrap()
        .with_submit_retry(Duration::from_millis(10), 3);

    assert!(
        !tokio::time::timeout(Duration::from_secs(30), client.submit_block("00ff"))
            .await
            .unwrap()
    );
}
