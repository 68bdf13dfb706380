//! Integration tests for the network-control client
//!
//! These tests require a running network-control backend.
//! Set NETCTL_URL (and optionally NETCTL_TENANT) to run.

use netctl_client::NetCtlClient;
use std::time::Duration;

fn client() -> NetCtlClient {
    let url = std::env::var("NETCTL_URL").unwrap_or_else(|_| "http://localhost:9696".to_string());
    NetCtlClient::new(url, Duration::from_secs(10)).expect("Failed to create client")
}

fn tenant() -> String {
    std::env::var("NETCTL_TENANT").unwrap_or_else(|_| "default".to_string())
}

#[tokio::test]
#[ignore] // Requires running network-control backend
async fn test_create_and_find_network() {
    let client = client();
    let tenant = tenant();

    let name = format!("it-{}", std::process::id());
    let id = client.create_network(&tenant, &name).await.expect("Failed to create network");

    assert!(client.network_exists(&tenant, &id).await.expect("Failed to get network"));
    let found = client.get_network_by_name(&tenant, &name).await.expect("Failed to list networks");
    assert_eq!(found, Some(id));
}

#[tokio::test]
#[ignore]
async fn test_port_attachment_lifecycle() {
    let client = client();
    let tenant = tenant();

    let name = format!("it-ports-{}", std::process::id());
    let network = client.create_network(&tenant, &name).await.expect("Failed to create network");
    let port = client.create_port(&tenant, &network).await.expect("Failed to create port");

    client.plug_interface(&tenant, &network, &port, "it-instance-1").await.expect("Failed to plug");
    let found = client
        .find_port_by_attachment(&tenant, &network, "it-instance-1")
        .await
        .expect("Failed to find port");
    assert_eq!(found.as_deref(), Some(port.as_str()));

    client.unplug_interface(&tenant, &network, &port).await.expect("Failed to unplug");
    client.delete_port(&tenant, &network, &port).await.expect("Failed to delete port");
}

#[tokio::test]
#[ignore]
async fn test_unknown_network_does_not_exist() {
    let client = client();
    let exists = client
        .network_exists(&tenant(), "00000000-0000-0000-0000-000000000000")
        .await
        .expect("Request failed");
    assert!(!exists);
}
