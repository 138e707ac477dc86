use chat_core::{
    validate_name, Message, MessageKind, NameError, RejectReason, MAX_NAME_LEN, SERVER_SENDER,
};

#[test]
fn private_message_always_carries_recipient() {
    let msg = Message::private("alice", "bob", "yo");
    assert_eq!(msg.kind().name(), "PRIVATE");
    assert_eq!(msg.recipient(), Some("bob"));
    assert_eq!(msg.sender(), "alice");
    assert_eq!(msg.content(), "yo");
}

#[test]
fn only_private_messages_have_a_recipient() {
    assert_eq!(Message::broadcast("alice", "hi").recipient(), None);
    assert_eq!(Message::register("alice").recipient(), None);
    assert_eq!(Message::server_notice("bob joined").recipient(), None);
}

#[test]
fn relay_messages_use_the_server_sender() {
    for msg in [
        Message::register_ok("Welcome alice! 1 users connected."),
        Message::register_fail(RejectReason::Full),
        Message::user_list(&["alice"]),
        Message::server_notice("alice joined"),
        Message::error("user not found: carol"),
    ] {
        assert_eq!(msg.sender(), SERVER_SENDER, "{:?}", msg.kind());
    }
}

#[test]
fn timestamp_is_formatted_local_time() {
    let msg = Message::broadcast("alice", "hi");
    let ts = msg.timestamp();
    // YYYY-MM-DD HH:MM:SS
    assert_eq!(ts.len(), 19, "{ts}");
    assert_eq!(&ts[4..5], "-");
    assert_eq!(&ts[10..11], " ");
    assert_eq!(&ts[13..14], ":");
}

#[test]
fn user_list_keeps_order_and_round_trips_names() {
    let msg = Message::user_list(&["alice", "bob", "carol"]);
    assert_eq!(msg.content(), "alice, bob, carol");
    assert_eq!(msg.users(), Some(vec!["alice", "bob", "carol"]));

    let empty = Message::user_list::<&str>(&[]);
    assert_eq!(empty.users(), Some(vec![]));
    assert_eq!(Message::broadcast("a", "b").users(), None);
}

#[test]
fn register_fail_carries_reason_code() {
    let msg = Message::register_fail(RejectReason::NameInUse);
    assert_eq!(msg.content(), "NameInUse");
    assert_eq!(msg.reject_reason(), Some(RejectReason::NameInUse));
    assert_eq!(Message::error("Full").reject_reason(), None);
}

#[test]
fn reject_reason_codes_parse_back() {
    for reason in [
        RejectReason::NameInUse,
        RejectReason::Full,
        RejectReason::InvalidName,
        RejectReason::AlreadyRegistered,
    ] {
        assert_eq!(reason.as_str().parse::<RejectReason>(), Ok(reason));
        assert_eq!(reason.to_string(), reason.as_str());
    }
    assert!("Busy".parse::<RejectReason>().is_err());
}

#[test]
fn serializes_to_flat_wire_object() {
    let msg = Message::private("alice", "bob", "yo").with_timestamp("2024-05-01 18:22:03");
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "type": "PRIVATE",
            "recipient": "bob",
            "sender": "alice",
            "content": "yo",
            "timestamp": "2024-05-01 18:22:03",
        })
    );

    let value = serde_json::to_value(Message::broadcast("alice", "hi")).unwrap();
    assert_eq!(value["type"], "BROADCAST");
    assert!(value.get("recipient").is_none());
}

#[test]
fn kind_names_match_wire_tags() {
    let kinds = [
        MessageKind::Register,
        MessageKind::RegisterOk,
        MessageKind::RegisterFail,
        MessageKind::Broadcast,
        MessageKind::Private {
            recipient: "bob".into(),
        },
        MessageKind::ListUsers,
        MessageKind::UserList,
        MessageKind::Disconnect,
        MessageKind::ServerNotice,
        MessageKind::Error,
    ];
    for kind in kinds {
        let msg = Message::new(kind.clone(), "alice", "");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], kind.name());
    }
}

#[test]
fn accepts_ordinary_names() {
    assert_eq!(validate_name("alice"), Ok(()));
    assert_eq!(validate_name("Bob_99"), Ok(()));
    assert_eq!(validate_name("josé"), Ok(()));
    assert_eq!(validate_name(&"x".repeat(MAX_NAME_LEN)), Ok(()));
}

#[test]
fn rejects_names_that_break_the_console_syntax() {
    assert_eq!(validate_name(""), Err(NameError::Empty));
    assert_eq!(validate_name(&"x".repeat(21)), Err(NameError::TooLong(21)));
    assert_eq!(validate_name("/p"), Err(NameError::CommandPrefix));
    assert_eq!(validate_name("two words"), Err(NameError::Whitespace));
    assert_eq!(validate_name("a,b"), Err(NameError::Comma));
}

#[test]
fn name_length_counts_characters_not_bytes() {
    // 20 two-byte characters
    assert_eq!(validate_name(&"é".repeat(20)), Ok(()));
}
