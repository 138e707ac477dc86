use chat_core::{Message, MessageKind};
use chat_protocol::wire_types::MAX_DATAGRAM_LEN;
use chat_protocol::{decode, decode_datagram, encode, encode_datagram, CodecError};

#[test]
fn decodes_what_it_encodes() {
    let msg = Message::private("alice", "bob", "yo").with_timestamp("2024-05-01 18:22:03");
    let bytes = encode(&msg).unwrap();
    assert_eq!(decode(&bytes).unwrap(), msg);
}

#[test]
fn decodes_hand_written_payload() {
    let raw = br#"{"type":"BROADCAST","sender":"bob","content":"hi","timestamp":"2024-05-01 18:22:03"}"#;
    let msg = decode(raw).unwrap();
    assert_eq!(msg.kind(), &MessageKind::Broadcast);
    assert_eq!(msg.sender(), "bob");
    assert_eq!(msg.content(), "hi");
    assert_eq!(msg.timestamp(), "2024-05-01 18:22:03");
}

#[test]
fn missing_content_decodes_as_empty() {
    let raw = br#"{"type":"LIST_USERS","sender":"bob","timestamp":"2024-05-01 18:22:03"}"#;
    let msg = decode(raw).unwrap();
    assert_eq!(msg.kind(), &MessageKind::ListUsers);
    assert_eq!(msg.content(), "");
}

#[test]
fn stray_recipient_outside_private_is_ignored() {
    let raw = br#"{"type":"BROADCAST","sender":"bob","content":"hi","recipient":"","timestamp":"t"}"#;
    let msg = decode(raw).unwrap();
    assert_eq!(msg.recipient(), None);
}

#[test]
fn private_without_recipient_is_malformed() {
    let raw = br#"{"type":"PRIVATE","sender":"alice","content":"yo","timestamp":"t"}"#;
    assert!(matches!(decode(raw), Err(CodecError::Malformed(_))));
}

#[test]
fn unknown_type_is_malformed() {
    let raw = br#"{"type":"PUBLICO","sender":"alice","content":"yo","timestamp":"t"}"#;
    assert!(matches!(decode(raw), Err(CodecError::Malformed(_))));
}

#[test]
fn garbage_is_malformed() {
    assert!(matches!(decode(b"not json"), Err(CodecError::Malformed(_))));
    assert!(matches!(decode(&[0xff, 0xfe, 0x00]), Err(CodecError::Malformed(_))));
    assert!(matches!(decode(b""), Err(CodecError::Empty)));
}

#[test]
fn two_concatenated_payloads_are_not_one_message() {
    let a = encode(&Message::broadcast("a", "1")).unwrap();
    let b = encode(&Message::broadcast("b", "2")).unwrap();
    let joined = [a, b].concat();
    assert!(decode_datagram(&joined).is_err());
}

#[test]
fn datagram_size_is_bounded() {
    let small = encode_datagram(&Message::broadcast("alice", "hi")).unwrap();
    assert_eq!(decode_datagram(&small).unwrap().content(), "hi");

    let huge = Message::broadcast("alice", "x".repeat(MAX_DATAGRAM_LEN));
    assert!(matches!(
        encode_datagram(&huge),
        Err(CodecError::TooLarge { max: MAX_DATAGRAM_LEN, .. })
    ));
}
