use super::*;

#[test]
fn test_kind_codes_match_deployment_convention() {
    assert_eq!(MessageKind::RegisterProducer.code(), 100);
    assert_eq!(MessageKind::RegisterConsumer.code(), 200);
    assert_eq!(MessageKind::Ack.code(), 300);
    assert_eq!(MessageKind::Nack.code(), 400);
    assert_eq!(MessageKind::Subscribe.code(), 500);
    assert_eq!(MessageKind::Notify.code(), 600);
}

#[test]
fn test_kind_from_code() {
    for kind in [
        MessageKind::RegisterProducer,
        MessageKind::RegisterConsumer,
        MessageKind::Ack,
        MessageKind::Nack,
        MessageKind::Subscribe,
        MessageKind::Unsubscribe,
        MessageKind::ListAvailableCategories,
        MessageKind::ListSubscriptions,
        MessageKind::Notify,
    ] {
        assert_eq!(MessageKind::from_code(kind.code()), kind);
    }
    assert_eq!(MessageKind::from_code(7), MessageKind::Unknown(7));
}

#[test]
fn test_body_limit() {
    assert!(Body::new("a".repeat(MAX_BODY_LEN)).is_ok());
    assert_eq!(
        Body::new("a".repeat(BODY_CAPACITY)),
        Err(PacketError::BodyTooLarge {
            len: BODY_CAPACITY,
            max: MAX_BODY_LEN
        })
    );
}

#[test]
fn test_body_truncated_respects_char_boundary() {
    // 'é' is two bytes; 256 of them straddle the limit.
    let text = "é".repeat(256);
    let body = Body::truncated(&text);
    assert!(body.as_str().len() <= MAX_BODY_LEN);
    assert_eq!(body.as_str().len(), 510);
}

#[test]
fn test_body_rejects_interior_nul() {
    assert_eq!(
        Body::new("a\0b"),
        Err(PacketError::InteriorNul { offset: 1 })
    );
    assert_eq!(
        Body::new("\0"),
        Err(PacketError::InteriorNul { offset: 0 })
    );
}

#[test]
fn test_body_truncated_stops_at_nul() {
    assert_eq!(Body::truncated("a\0b").as_str(), "a");
    assert_eq!(Body::truncated("\0tail").as_str(), "");
}

#[test]
fn test_body_survives_the_wire() {
    let packet = ControlPacket::notification(Category(7), Body::truncated("a\0b"));
    let decoded = decode(&encode(&packet)).unwrap();
    assert_eq!(decoded.body, packet.body);
}

#[test]
fn test_nack_carries_reason() {
    let packet = ControlPacket::nack(Category(3), "not found");
    assert_eq!(packet.kind, MessageKind::Nack);
    assert_eq!(packet.sender, DISPATCHER_ID);
    assert_eq!(packet.category, Category(3));
    assert_eq!(packet.body.as_str(), "not found");
}

#[test]
fn test_notification_is_sent_as_dispatcher() {
    let packet = ControlPacket::notification(Category(7), Body::new("hello").unwrap());
    assert_eq!(packet.kind, MessageKind::Notify);
    assert_eq!(packet.sender, ClientId(0));
}
