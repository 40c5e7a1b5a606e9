//! End-to-end publish/subscribe over the in-process channel transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use catbus::client::{ClientError, Notification};
use catbus::dispatcher::{reasons, FanOutReport};
use catbus::packet::listing::CategoryListing;
use catbus::packet::{Body, Category, ClientId};
use catbus::transport::ChannelTransport;

use common::{RunningDispatcher, QUIET_PERIOD};

fn channel_transport() -> Arc<ChannelTransport> {
    Arc::new(ChannelTransport::new(64))
}

async fn next_notification(stream: &mut catbus::client::Notifications) -> Notification {
    tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("notification should arrive")
        .expect("stream should stay open")
}

#[tokio::test]
async fn test_subscribe_notify_unsubscribe() {
    let running = RunningDispatcher::start(channel_transport()).await;

    let producer = running.producer(1, 7).await;
    let mut consumer = running.consumer(42).await;
    let mut notifications = consumer.notifications().unwrap();

    consumer.subscribe(Category(7)).await.unwrap();
    producer.notify("hello").await.unwrap();

    let notification = next_notification(&mut notifications).await;
    assert_eq!(notification.category, Category(7));
    assert_eq!(notification.body.as_str(), "hello");

    consumer.unsubscribe(Category(7)).await.unwrap();
    producer.notify("nobody listens").await.unwrap();

    let quiet = tokio::time::timeout(QUIET_PERIOD, notifications.next()).await;
    assert!(quiet.is_err(), "unsubscribed consumer received {:?}", quiet);

    let dispatcher = running.stop().await;
    assert!(!dispatcher
        .subscriptions()
        .is_subscribed(ClientId(42), Category(7)));
}

#[tokio::test]
async fn test_second_producer_for_category_is_rejected() {
    let running = RunningDispatcher::start(channel_transport()).await;
    let _owner = running.producer(1, 7).await;

    let err = catbus::client::Producer::register(
        running.transport.clone(),
        running.endpoint,
        ClientId(2),
        Category(7),
        common::action_endpoint(2),
    )
    .await
    .err()
    .expect("second producer should be rejected");

    assert!(matches!(err, ClientError::Rejected(reason) if reason == reasons::CATEGORY_EXISTS));

    let dispatcher = running.stop().await;
    assert_eq!(dispatcher.categories().owner(Category(7)), Some(ClientId(1)));
}

#[tokio::test]
async fn test_listings_through_consumer() {
    let running = RunningDispatcher::start(channel_transport()).await;
    let mut consumer = running.consumer(5).await;

    assert!(consumer.available_categories().await.unwrap().is_empty());
    assert!(consumer.subscriptions().await.unwrap().is_empty());

    let _p1 = running.producer(1, 7).await;
    let _p2 = running.producer(2, 3).await;
    consumer.subscribe(Category(3)).await.unwrap();
    consumer.subscribe(Category(7)).await.unwrap();

    assert_eq!(
        consumer.available_categories().await.unwrap(),
        vec![
            CategoryListing {
                producer: ClientId(1),
                category: Category(7),
            },
            CategoryListing {
                producer: ClientId(2),
                category: Category(3),
            },
        ]
    );
    assert_eq!(
        consumer.subscriptions().await.unwrap(),
        vec![Category(3), Category(7)]
    );

    running.stop().await;
}

#[tokio::test]
async fn test_duplicate_subscribe_is_rejected() {
    let running = RunningDispatcher::start(channel_transport()).await;
    let producer = running.producer(1, 7).await;
    let mut consumer = running.consumer(9).await;
    let mut notifications = consumer.notifications().unwrap();

    consumer.subscribe(Category(7)).await.unwrap();
    let err = consumer.subscribe(Category(7)).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(reason) if reason == reasons::ALREADY_SUBSCRIBED));

    producer.notify("once").await.unwrap();
    assert_eq!(next_notification(&mut notifications).await.body.as_str(), "once");

    let quiet = tokio::time::timeout(QUIET_PERIOD, notifications.next()).await;
    assert!(quiet.is_err(), "duplicate delivery: {:?}", quiet);

    running.stop().await;
}

#[tokio::test]
async fn test_unsubscribe_without_subscription_is_rejected() {
    let running = RunningDispatcher::start(channel_transport()).await;
    let mut consumer = running.consumer(9).await;

    let err = consumer.unsubscribe(Category(7)).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(reason) if reason == reasons::NOT_FOUND));

    running.stop().await;
}

#[tokio::test]
async fn test_fan_out_preserves_producer_order_per_consumer() {
    let running = RunningDispatcher::start(channel_transport()).await;
    let producer = running.producer(1, 7).await;

    let mut first = running.consumer(10).await;
    let mut second = running.consumer(11).await;
    let mut first_stream = first.notifications().unwrap();
    let mut second_stream = second.notifications().unwrap();
    first.subscribe(Category(7)).await.unwrap();
    second.subscribe(Category(7)).await.unwrap();

    for text in ["a", "b", "c"] {
        producer.notify(text).await.unwrap();
    }

    for stream in [&mut first_stream, &mut second_stream] {
        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(next_notification(stream).await.body);
        }
        assert_eq!(
            received,
            vec![
                Body::new("a").unwrap(),
                Body::new("b").unwrap(),
                Body::new("c").unwrap(),
            ]
        );
    }

    running.stop().await;
}

#[tokio::test]
async fn test_departed_consumer_does_not_stop_delivery() {
    let transport = channel_transport();
    let running = RunningDispatcher::start(transport.clone()).await;
    let producer = running.producer(1, 7).await;

    let mut leaving = running.consumer(20).await;
    let mut staying = running.consumer(21).await;
    let mut stream = staying.notifications().unwrap();
    leaving.subscribe(Category(7)).await.unwrap();
    staying.subscribe(Category(7)).await.unwrap();

    let departed = common::consumer_endpoints(20).notification;
    drop(leaving);
    tokio::time::timeout(Duration::from_secs(1), async {
        while transport.is_bound(departed).await {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("departed consumer's endpoint should be torn down");

    producer.notify("still here").await.unwrap();
    producer.notify("and again").await.unwrap();

    assert_eq!(next_notification(&mut stream).await.body.as_str(), "still here");
    assert_eq!(next_notification(&mut stream).await.body.as_str(), "and again");

    let dispatcher = running.stop().await;
    assert_eq!(dispatcher.subscriptions().subscribers_of(Category(7)).len(), 2);

    let report = dispatcher
        .distribute(Category(7), &Body::new("after stop").unwrap())
        .await;
    assert_eq!(
        report,
        FanOutReport {
            matched: 2,
            delivered: 1,
            failed: 1,
        }
    );
    assert_eq!(next_notification(&mut stream).await.body.as_str(), "after stop");
}
