use super::*;
use crate::packet::{Category, ClientId, MessageKind};

fn packet(kind: MessageKind) -> ControlPacket {
    ControlPacket::new(kind, ClientId(1)).with_category(Category(7))
}

#[tokio::test]
async fn test_channel_send_and_recv() {
    let transport = ChannelTransport::new(4);
    let mut inbox = transport.bind(EndpointId(10)).await.unwrap();

    transport
        .send(EndpointId(10), &packet(MessageKind::Notify))
        .await
        .unwrap();

    let received = inbox.recv().await.unwrap();
    assert_eq!(received.kind, MessageKind::Notify);
    assert_eq!(received.category, Category(7));
}

#[tokio::test]
async fn test_channel_fifo_per_destination() {
    let transport = ChannelTransport::new(8);
    let mut inbox = transport.bind(EndpointId(10)).await.unwrap();

    for category in 1..=3 {
        let p = packet(MessageKind::Notify).with_category(Category(category));
        transport.send(EndpointId(10), &p).await.unwrap();
    }

    for category in 1..=3 {
        assert_eq!(inbox.recv().await.unwrap().category, Category(category));
    }
}

#[tokio::test]
async fn test_channel_send_to_unbound_endpoint() {
    let transport = ChannelTransport::new(4);
    let result = transport
        .send(EndpointId(99), &packet(MessageKind::Ack))
        .await;
    assert!(matches!(result, Err(TransportError::Unreachable(EndpointId(99)))));
}

#[tokio::test]
async fn test_channel_send_after_inbox_dropped() {
    let transport = ChannelTransport::new(4);
    let inbox = transport.bind(EndpointId(10)).await.unwrap();
    drop(inbox);

    assert!(!transport.is_bound(EndpointId(10)).await);
    let result = transport
        .send(EndpointId(10), &packet(MessageKind::Ack))
        .await;
    assert!(matches!(result, Err(TransportError::Unreachable(_))));
}

#[tokio::test]
async fn test_channel_bind_twice_rejected() {
    let transport = ChannelTransport::new(4);
    let _inbox = transport.bind(EndpointId(10)).await.unwrap();

    let result = transport.bind(EndpointId(10)).await;
    assert!(matches!(result, Err(TransportError::AddressInUse(_))));
}

#[tokio::test]
async fn test_channel_rebind_after_drop() {
    let transport = ChannelTransport::new(4);
    drop(transport.bind(EndpointId(10)).await.unwrap());

    assert!(transport.bind(EndpointId(10)).await.is_ok());
}

#[tokio::test]
async fn test_channel_try_send_full() {
    let transport = ChannelTransport::new(1);
    let _inbox = transport.bind(EndpointId(10)).await.unwrap();

    transport
        .try_send(EndpointId(10), &packet(MessageKind::Notify))
        .await
        .unwrap();
    let result = transport
        .try_send(EndpointId(10), &packet(MessageKind::Notify))
        .await;
    assert!(matches!(result, Err(TransportError::Full(EndpointId(10)))));
}

#[tokio::test]
async fn test_channel_unbind_drains_then_closes() {
    let transport = ChannelTransport::new(4);
    let mut inbox = transport.bind(EndpointId(10)).await.unwrap();
    transport
        .send(EndpointId(10), &packet(MessageKind::Notify))
        .await
        .unwrap();

    transport.unbind(EndpointId(10)).await;

    assert!(inbox.recv().await.is_ok());
    assert!(matches!(
        inbox.recv().await,
        Err(TransportError::Closed(EndpointId(10)))
    ));
}
