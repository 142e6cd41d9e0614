//! Length-delimited protobuf framing for the pairing and control ports.
//!
//! Every message on either port is `varint(len) || body`. These functions are
//! synchronous and work on byte slices; the async read loop that feeds them
//! lives in the client transport crate, which calls [`read_frame`] repeatedly
//! against a growing reassembly buffer.

use bytes::BytesMut;
use prost::encoding::{self, WireType};
use prost::Message;

use crate::error::{ProtoError, Result};

/// Maximum allowed frame payload (16 KiB). Remote and pairing messages are
/// tiny; a length prefix beyond this indicates a corrupt stream.
pub const MAX_FRAME_SIZE: usize = 16 * 1024;

/// A varint never spans more than 10 bytes; with this many bytes available a
/// failed decode means the prefix is malformed rather than truncated.
const MAX_VARINT_LEN: usize = 10;

/// Encode an unsigned integer as a base-128 little-endian varint.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoding::encoded_len_varint(value));
    encoding::encode_varint(value, &mut buf);
    buf
}

/// Decode a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed, or `None` when the
/// buffer ends mid-varint.
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut cursor = buf;
    match encoding::decode_varint(&mut cursor) {
        Ok(value) => Some((value, buf.len() - cursor.len())),
        Err(_) => None,
    }
}

/// Encode a protobuf field key: `(field_number << 3) | wire_type`, as a varint.
pub fn encode_tag(field_number: u32, wire_type: WireType) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoding::key_len(field_number));
    encoding::encode_key(field_number, wire_type, &mut buf);
    buf
}

/// Prefix `payload` with its varint-encoded length.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = encode_varint(payload.len() as u64);
    buf.reserve(payload.len());
    buf.extend_from_slice(payload);
    buf
}

/// Try to split one length-prefixed frame off the front of `buf`.
///
/// Returns `Ok(Some((payload, consumed)))` when a complete frame is present,
/// `Ok(None)` when more bytes are needed (partial length varint or partial
/// body), and `Err` when the length prefix itself is malformed or announces a
/// payload beyond [`MAX_FRAME_SIZE`].
pub fn read_frame(buf: &[u8]) -> Result<Option<(&[u8], usize)>> {
    let mut cursor = buf;
    let payload_len = match prost::decode_length_delimiter(&mut cursor) {
        Ok(len) => len,
        // With 10+ bytes in hand the varint cannot merely be truncated.
        Err(_) if buf.len() >= MAX_VARINT_LEN => return Err(ProtoError::MalformedLengthPrefix),
        Err(_) => return Ok(None),
    };

    if payload_len > MAX_FRAME_SIZE {
        return Err(ProtoError::FrameTooLarge {
            len: payload_len,
            max: MAX_FRAME_SIZE,
        });
    }

    let varint_len = buf.len() - cursor.len();
    let total = varint_len + payload_len;

    if buf.len() < total {
        return Ok(None); // Have the length prefix but not the full payload yet.
    }

    Ok(Some((&buf[varint_len..total], total)))
}

/// Encode a protobuf message with a varint length prefix.
///
/// Returns the encoded bytes: `[varint length][protobuf payload]`.
pub fn encode_length_delimited<M: Message>(msg: &M) -> Result<Vec<u8>> {
    let payload_len = msg.encoded_len();
    let varint_len = prost::length_delimiter_len(payload_len);
    let mut buf = Vec::with_capacity(varint_len + payload_len);
    prost::encode_length_delimiter(payload_len, &mut buf)?;
    msg.encode(&mut buf)?;
    Ok(buf)
}

/// Try to decode a length-delimited protobuf message from a buffer.
///
/// Returns `Ok(Some((message, bytes_consumed)))` if a complete message is
/// available, `Ok(None)` if the buffer doesn't contain a complete message
/// yet, or `Err` on malformed data.
pub fn decode_length_delimited<M: Message + Default>(buf: &[u8]) -> Result<Option<(M, usize)>> {
    match read_frame(buf)? {
        Some((payload, consumed)) => {
            let msg = M::decode(payload)?;
            Ok(Some((msg, consumed)))
        }
        None => Ok(None),
    }
}

/// Encode a length-delimited protobuf message into a `BytesMut`.
///
/// Useful for building up multiple messages in a single buffer.
pub fn encode_into<M: Message>(msg: &M, buf: &mut BytesMut) -> Result<()> {
    let payload_len = msg.encoded_len();
    let varint_len = prost::length_delimiter_len(payload_len);
    buf.reserve(varint_len + payload_len);
    prost::encode_length_delimiter(payload_len, buf)?;
    msg.encode(buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire;

    #[test]
    fn varint_150_encodes_to_two_bytes() {
        assert_eq!(encode_varint(150), vec![0x96, 0x01]);
        assert_eq!(decode_varint(&[0x96, 0x01]), Some((150, 2)));
    }

    #[test]
    fn varint_roundtrip() {
        for n in [0u64, 1, 127, 128, 300, 16384, u32::MAX as u64, u64::MAX] {
            let encoded = encode_varint(n);
            assert_eq!(decode_varint(&encoded), Some((n, encoded.len())));
        }
    }

    #[test]
    fn truncated_varint_decodes_to_none() {
        // Continuation bit set, but no following byte.
        assert_eq!(decode_varint(&[0x96]), None);
        assert_eq!(decode_varint(&[]), None);
    }

    #[test]
    fn tag_field_one_varint_is_0x08() {
        assert_eq!(encode_tag(1, WireType::Varint), vec![0x08]);
    }

    #[test]
    fn tag_high_field_numbers_match_wire_layout() {
        assert_eq!(encode_tag(10, WireType::LengthDelimited), vec![0x52]);
        assert_eq!(encode_tag(20, WireType::LengthDelimited), vec![0xA2, 0x01]);
        assert_eq!(encode_tag(30, WireType::LengthDelimited), vec![0xF2, 0x01]);
        assert_eq!(encode_tag(40, WireType::LengthDelimited), vec![0xC2, 0x02]);
    }

    #[test]
    fn frame_prefixes_length() {
        let framed = frame(&[0xDE, 0xAD]);
        assert_eq!(framed, vec![0x02, 0xDE, 0xAD]);
    }

    #[test]
    fn read_frame_returns_payload_and_total() {
        let mut bytes = frame(b"hello");
        let frame_len = bytes.len();
        bytes.extend_from_slice(b"suffix");

        let (payload, consumed) = read_frame(&bytes)
            .expect("should not error")
            .expect("should have a complete frame");
        assert_eq!(payload, b"hello");
        assert_eq!(consumed, frame_len);
    }

    #[test]
    fn partial_length_varint_returns_none() {
        // 0x80 is an unfinished varint; nothing to dispatch, no error.
        assert!(read_frame(&[0x80]).expect("should not error").is_none());
        assert!(read_frame(&[]).expect("should not error").is_none());
    }

    #[test]
    fn partial_body_returns_none() {
        let bytes = frame(b"hello");
        for split in 0..bytes.len() {
            let result = read_frame(&bytes[..split]).expect("should not error");
            assert!(result.is_none(), "split at {split} must not yield a frame");
        }
    }

    #[test]
    fn two_frames_in_one_buffer_dispatch_in_order() {
        let mut combined = frame(b"first");
        combined.extend_from_slice(&frame(b"second"));

        let (one, used) = read_frame(&combined).unwrap().expect("first frame");
        assert_eq!(one, b"first");
        let (two, used2) = read_frame(&combined[used..]).unwrap().expect("second frame");
        assert_eq!(two, b"second");
        assert_eq!(used + used2, combined.len());
    }

    #[test]
    fn oversized_length_prefix_is_an_error() {
        let bytes = encode_varint((MAX_FRAME_SIZE + 1) as u64);
        assert!(matches!(
            read_frame(&bytes),
            Err(ProtoError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn malformed_length_prefix_is_an_error() {
        // Ten continuation bytes cannot be a truncated varint.
        let bytes = [0xFFu8; 12];
        assert!(matches!(
            read_frame(&bytes),
            Err(ProtoError::MalformedLengthPrefix)
        ));
    }

    #[test]
    fn roundtrip_remote_message() {
        let msg = wire::RemoteMessage::key_inject(23, wire::DIRECTION_PRESS);

        let encoded = encode_length_delimited(&msg).expect("encode should succeed");
        let (decoded, consumed) = decode_length_delimited::<wire::RemoteMessage>(&encoded)
            .expect("decode should succeed")
            .expect("should have complete message");

        let inject = decoded.key_inject.expect("key_inject present");
        assert_eq!(inject.keycode, 23);
        assert_eq!(inject.direction, wire::DIRECTION_PRESS);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn encode_into_bytesmut() {
        let msg = wire::RemoteMessage::ping_response(7);

        let mut buf = BytesMut::new();
        encode_into(&msg, &mut buf).expect("encode should succeed");
        encode_into(&msg, &mut buf).expect("second encode should succeed");

        let (first, used) = decode_length_delimited::<wire::RemoteMessage>(&buf)
            .expect("decode should succeed")
            .expect("should have complete message");
        assert_eq!(first.ping_response.expect("pong").id, 7);

        let (_, used2) = decode_length_delimited::<wire::RemoteMessage>(&buf[used..])
            .expect("decode should succeed")
            .expect("should have second message");
        assert_eq!(used + used2, buf.len());
    }
}
