//! Bridge framing for `tokio_util` framed I/O.
//!
//! ## Wire format
//!
//! ```text
//! magic:   [u8; 4]  "FSB1"
//! kind:    u8       (see MessageKind)
//! length:  u32 LE   payload length
//! payload: [u8]     `length` bytes
//! ```

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ScreenError;
use crate::transport::{Message, MessageKind};

// ── Constants ────────────────────────────────────────────────────

/// Frame magic.
pub const MAGIC: [u8; 4] = *b"FSB1";

/// Header length: magic + kind + length.
pub const HEADER_SIZE: usize = 9;

/// Largest payload the codec accepts.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

// ── BridgeCodec ──────────────────────────────────────────────────

/// Encoder/decoder for bridge [`Message`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeCodec;

impl Decoder for BridgeCodec {
    type Item = Message;
    type Error = ScreenError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }
        if src[0..4] != MAGIC {
            return Err(ScreenError::InvalidMagic);
        }

        let kind = src[4];
        let length = u32::from_le_bytes([src[5], src[6], src[7], src[8]]) as usize;
        if length > MAX_PAYLOAD_SIZE {
            return Err(ScreenError::FrameTooLarge {
                size: length,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        if src.len() < HEADER_SIZE + length {
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(length).freeze();

        Ok(Some(Message {
            kind: MessageKind::from(kind),
            payload,
        }))
    }
}

impl Encoder<Message> for BridgeCodec {
    type Error = ScreenError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = item.payload.len();
        if length > MAX_PAYLOAD_SIZE {
            return Err(ScreenError::FrameTooLarge {
                size: length,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        dst.reserve(HEADER_SIZE + length);
        dst.put_slice(&MAGIC);
        dst.put_u8(item.kind.to_u8());
        dst.put_u32_le(length as u32);
        dst.put_slice(&item.payload);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(msg: Message) -> BytesMut {
        let mut buf = BytesMut::new();
        BridgeCodec.encode(msg, &mut buf).unwrap();
        buf
    }

    #[test]
    fn header_layout() {
        let buf = encoded(Message::screen_frame(vec![7u8; 3]));
        assert_eq!(&buf[..], b"FSB1\x16\x03\x00\x00\x00\x07\x07\x07");
    }

    #[test]
    fn partial_input_waits_for_more() {
        let full = encoded(Message::screen_frame(vec![1u8; 1024]));

        let mut src = BytesMut::from(&full[..5]);
        assert!(BridgeCodec.decode(&mut src).unwrap().is_none());

        let mut src = BytesMut::from(&full[..HEADER_SIZE + 100]);
        assert!(BridgeCodec.decode(&mut src).unwrap().is_none());

        src.extend_from_slice(&full[HEADER_SIZE + 100..]);
        let msg = BridgeCodec.decode(&mut src).unwrap().unwrap();
        assert_eq!(msg.kind, MessageKind::ScreenFrame);
        assert_eq!(msg.payload.len(), 1024);
        assert!(src.is_empty());
    }

    #[test]
    fn back_to_back_messages() {
        let mut src = encoded(Message::command(MessageKind::Other(0x42)));
        src.extend_from_slice(&encoded(Message::screen_frame(vec![9u8; 4])));

        let first = BridgeCodec.decode(&mut src).unwrap().unwrap();
        assert_eq!(first.kind, MessageKind::Other(0x42));
        assert!(first.payload.is_empty());

        let second = BridgeCodec.decode(&mut src).unwrap().unwrap();
        assert_eq!(&second.payload[..], &[9, 9, 9, 9]);
        assert!(BridgeCodec.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut src = BytesMut::from(&b"FSB0\x16\x00\x00\x00\x00"[..]);
        assert!(matches!(
            BridgeCodec.decode(&mut src),
            Err(ScreenError::InvalidMagic)
        ));
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut src = BytesMut::from(&b"FSB1\x16"[..]);
        src.put_u32_le((MAX_PAYLOAD_SIZE + 1) as u32);
        assert!(matches!(
            BridgeCodec.decode(&mut src),
            Err(ScreenError::FrameTooLarge { .. })
        ));
    }
}
