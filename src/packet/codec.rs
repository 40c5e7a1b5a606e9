//! Fixed-size wire codec.
//!
//! Layout, integers big-endian:
//! ```text
//! kind:i32 | body:[u8; 512] | sender:i32 | category:i32 | notification:u32 | action:u32
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{
    Body, Category, ClientId, ControlPacket, EndpointId, MessageKind, PacketError, Result,
    BODY_CAPACITY,
};

/// Size of every encoded frame.
pub const FRAME_SIZE: usize = 4 + BODY_CAPACITY + 4 + 4 + 4 + 4;

/// Encode a packet into a single frame.
pub fn encode(packet: &ControlPacket) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_SIZE);
    buf.put_i32(packet.kind.code());

    let text = packet.body.as_str().as_bytes();
    buf.put_slice(text);
    buf.put_bytes(0, BODY_CAPACITY - text.len());

    buf.put_i32(packet.sender.0);
    buf.put_i32(packet.category.0);
    buf.put_u32(packet.notification_endpoint.0);
    buf.put_u32(packet.action_endpoint.0);
    buf.freeze()
}

/// Decode a single frame.
pub fn decode(mut frame: &[u8]) -> Result<ControlPacket> {
    if frame.len() != FRAME_SIZE {
        return Err(PacketError::Malformed {
            expected: FRAME_SIZE,
            actual: frame.len(),
        });
    }

    let kind = MessageKind::from_code(frame.get_i32());

    let raw = &frame[..BODY_CAPACITY];
    // A full buffer without terminator still counts as text; cap at the body limit.
    let end = raw
        .iter()
        .position(|b| *b == 0)
        .unwrap_or(BODY_CAPACITY);
    let body = Body::truncated(&String::from_utf8_lossy(&raw[..end]));
    frame.advance(BODY_CAPACITY);

    Ok(ControlPacket {
        kind,
        body,
        sender: ClientId(frame.get_i32()),
        category: Category(frame.get_i32()),
        notification_endpoint: EndpointId(frame.get_u32()),
        action_endpoint: EndpointId(frame.get_u32()),
    })
}
