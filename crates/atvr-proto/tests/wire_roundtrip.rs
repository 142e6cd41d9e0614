//! Integration tests: encode → decode roundtrip for every wire message, plus
//! the literal byte layouts the TV requires.
//!
//! These catch field-numbering mistakes, missing derives, and prefix errors
//! that unit tests on individual modules would miss.

use prost::Message;

use atvr_proto::codec;
use atvr_proto::wire::*;

// ---------------------------------------------------------------------------
// Pairing port
// ---------------------------------------------------------------------------

#[test]
fn pairing_request_roundtrip() {
    let original = PairingMessage::request("living room remote", "com.example.remote");

    let bytes = original.encode_to_vec();
    let decoded = PairingMessage::decode(bytes.as_slice()).expect("decode should succeed");

    assert_eq!(decoded.protocol_version, PROTOCOL_VERSION);
    assert_eq!(decoded.status, status::OK);
    let request = decoded.pairing_request.expect("pairing_request present");
    assert_eq!(request.client_name, "living room remote");
    assert_eq!(request.service_name, "com.example.remote");
    assert!(request.device_info.is_some());
}

#[test]
fn pairing_options_roundtrip() {
    let original = PairingMessage::options();

    let bytes = original.encode_to_vec();
    let decoded = PairingMessage::decode(bytes.as_slice()).expect("decode should succeed");

    let options = decoded.options.expect("options present");
    assert_eq!(options.input_encodings.len(), 1);
    assert_eq!(
        options.input_encodings[0].encoding_type,
        ENCODING_TYPE_HEXADECIMAL
    );
    assert_eq!(options.input_encodings[0].symbol_length, ENCODING_SYMBOL_LENGTH);
    assert_eq!(options.preferred_role, ROLE_TYPE_INPUT);
}

#[test]
fn pairing_configuration_roundtrip() {
    let original = PairingMessage::configuration();

    let bytes = original.encode_to_vec();
    let decoded = PairingMessage::decode(bytes.as_slice()).expect("decode should succeed");

    let configuration = decoded.configuration.expect("configuration present");
    assert_eq!(configuration.client_role, ROLE_TYPE_INPUT);
    assert_eq!(
        configuration.encoding.expect("encoding present").symbol_length,
        ENCODING_SYMBOL_LENGTH
    );
}

#[test]
fn pairing_secret_roundtrip() {
    let digest = vec![0xAB; 32];
    let original = PairingMessage::secret(digest.clone());

    let bytes = original.encode_to_vec();
    let decoded = PairingMessage::decode(bytes.as_slice()).expect("decode should succeed");

    assert_eq!(decoded.secret.expect("secret present").secret, digest);
}

#[test]
fn bad_secret_status_roundtrip() {
    let rejection = PairingMessage {
        protocol_version: PROTOCOL_VERSION,
        status: status::BAD_SECRET,
        ..PairingMessage::default()
    };

    let decoded =
        PairingMessage::decode(rejection.encode_to_vec().as_slice()).expect("decode should succeed");
    assert_eq!(decoded.status, status::BAD_SECRET);
    assert!(decoded.secret.is_none());
}

// ---------------------------------------------------------------------------
// Control port
// ---------------------------------------------------------------------------

#[test]
fn remote_configure_roundtrip() {
    let original = RemoteMessage::configure(DEFAULT_CONFIGURE_CODE, DeviceInfo::for_client("atvremote"));

    let bytes = original.encode_to_vec();
    let decoded = RemoteMessage::decode(bytes.as_slice()).expect("decode should succeed");

    let configure = decoded.remote_configure.expect("configure present");
    assert_eq!(configure.code1, DEFAULT_CONFIGURE_CODE);
}

#[test]
fn configure_ack_roundtrip() {
    let original = RemoteMessage::configure_ack(779);

    let decoded =
        RemoteMessage::decode(original.encode_to_vec().as_slice()).expect("decode should succeed");
    assert_eq!(decoded.configure_ack.expect("ack present").code1, 779);
    assert!(decoded.remote_configure.is_none());
}

#[test]
fn ping_echo_preserves_id() {
    let request = RemoteMessage {
        ping_request: Some(PingRequest { id: 42 }),
        ..RemoteMessage::default()
    };

    let decoded =
        RemoteMessage::decode(request.encode_to_vec().as_slice()).expect("decode should succeed");
    let id = decoded.ping_request.expect("ping present").id;

    let reply = RemoteMessage::ping_response(id);
    let reply_decoded =
        RemoteMessage::decode(reply.encode_to_vec().as_slice()).expect("decode should succeed");
    assert_eq!(reply_decoded.ping_response.expect("pong present").id, 42);
}

// ---------------------------------------------------------------------------
// Framed stream behavior
// ---------------------------------------------------------------------------

#[test]
fn framed_messages_survive_any_split() {
    let msg = RemoteMessage::key_inject(19, DIRECTION_PRESS);
    let framed = codec::encode_length_delimited(&msg).expect("encode should succeed");

    // Feed the frame through every possible two-chunk split and confirm the
    // reassembled buffer yields exactly one message.
    for split in 0..=framed.len() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&framed[..split]);

        let early = codec::decode_length_delimited::<RemoteMessage>(&buffer)
            .expect("partial input must not error");
        if split < framed.len() {
            assert!(early.is_none(), "split at {split} must not yield a message");
        }

        buffer.extend_from_slice(&framed[split..]);
        let (decoded, consumed) = codec::decode_length_delimited::<RemoteMessage>(&buffer)
            .expect("decode should succeed")
            .expect("complete buffer must yield the message");
        assert_eq!(consumed, framed.len());
        assert_eq!(decoded.key_inject.expect("inject present").keycode, 19);
    }
}

#[test]
fn two_frames_in_one_segment_dispatch_two_messages() {
    let mut segment = codec::encode_length_delimited(&RemoteMessage::key_inject(23, DIRECTION_PRESS))
        .expect("encode first");
    segment.extend_from_slice(
        &codec::encode_length_delimited(&RemoteMessage::key_inject(23, DIRECTION_RELEASE))
            .expect("encode second"),
    );

    let (first, used) = codec::decode_length_delimited::<RemoteMessage>(&segment)
        .expect("decode first")
        .expect("first message");
    let (second, used2) = codec::decode_length_delimited::<RemoteMessage>(&segment[used..])
        .expect("decode second")
        .expect("second message");

    assert_eq!(first.key_inject.expect("press").direction, DIRECTION_PRESS);
    assert_eq!(second.key_inject.expect("release").direction, DIRECTION_RELEASE);
    assert_eq!(used + used2, segment.len());
}
