use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use super::BrokerClient;
use crate::broker::{Broker, HttpPusher};
use crate::test_support::{fast_config, spawn_push_receiver, wait_until};
use crate::transport::serve;
use crate::utils::Error;

async fn start_broker() -> (String, Arc<Broker>) {
    let pusher = Arc::new(HttpPusher::new(Duration::from_secs(2)).unwrap());
    let broker = Arc::new(Broker::new(fast_config(), pusher));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(serve(listener, broker.clone()));
    (url, broker)
}

#[tokio::test]
async fn test_publish_generates_unique_ids() {
    let (url, broker) = start_broker().await;
    let mut client = BrokerClient::connect(&url).await.unwrap();

    let first = client.publish("chat", "one").await.unwrap();
    let second = client.publish("chat", "two").await.unwrap();

    assert_ne!(first, second);
    let chat = broker.find_topic("chat").unwrap();
    assert!(chat.contains(&first));
    assert!(chat.contains(&second));
}

#[tokio::test]
async fn test_publish_with_id_reports_duplicate() {
    let (url, _broker) = start_broker().await;
    let mut client = BrokerClient::connect(&url).await.unwrap();

    assert!(!client.publish_with_id("1", "chat", "a").await.unwrap());
    assert!(client.publish_with_id("1", "chat", "a").await.unwrap());
}

#[tokio::test]
async fn test_unsubscribe_unknown_topic_is_an_error() {
    let (url, _broker) = start_broker().await;
    let mut client = BrokerClient::connect(&url).await.unwrap();

    let err = client.unsubscribe("http://a", &["nope"]).await.unwrap_err();
    assert!(matches!(err, Error::Protocol(message) if message.contains("nope")));
}

#[tokio::test]
async fn test_end_to_end_push_to_subscriber() {
    let (url, broker) = start_broker().await;
    let (address, mut pushes) = spawn_push_receiver(200).await;
    let mut client = BrokerClient::connect(&url).await.unwrap();

    // retained before the subscriber shows up, then replayed
    let old = client.publish("orders", "first").await.unwrap();
    client.subscribe(&address, &["orders"], true).await.unwrap();
    let new = client.publish("orders", "second").await.unwrap();

    let mut received = Vec::new();
    for _ in 0..2 {
        let push = tokio::time::timeout(Duration::from_secs(2), pushes.recv())
            .await
            .expect("push received")
            .unwrap();
        assert_eq!(push.topic, "orders");
        received.push(push.id);
    }
    assert_eq!(received, vec![old.clone(), new.clone()]);

    let orders = broker.find_topic("orders").unwrap();
    let first = orders.message(&old).unwrap();
    wait_until("ack", || first.is_acked_by(&address) == Some(true)).await;

    client.unsubscribe(&address, &["orders"]).await.unwrap();
    assert!(!orders.subscriber(&address).unwrap().is_active());
    client.close().await.unwrap();
}
