use chat_client::format_display;
use chat_core::{Message, RejectReason};

const TS: &str = "2024-03-01 14:05:09";

#[test]
fn public_messages_show_time_and_sender() {
    let msg = Message::broadcast("bob", "hi").with_timestamp(TS);
    assert_eq!(format_display(&msg, "alice"), "[14:05:09] bob: hi");
}

#[test]
fn private_messages_depend_on_direction() {
    let msg = Message::private("bob", "alice", "psst").with_timestamp(TS);
    assert_eq!(
        format_display(&msg, "alice"),
        "[14:05:09] (private from bob): psst"
    );
    assert_eq!(
        format_display(&msg, "bob"),
        "[14:05:09] (private to alice): psst"
    );
}

#[test]
fn relay_messages() {
    assert_eq!(
        format_display(&Message::server_notice("bob joined"), "alice"),
        "[SYSTEM] bob joined"
    );
    assert_eq!(
        format_display(&Message::error("user not found: zed"), "alice"),
        "[ERROR] user not found: zed"
    );
    assert_eq!(
        format_display(&Message::user_list(&["alice", "bob"]), "alice"),
        "[SYSTEM] connected users: alice, bob"
    );
    assert_eq!(
        format_display(&Message::register_fail(RejectReason::Full), "alice"),
        "[ERROR] registration rejected: the chat room is full"
    );
}

#[test]
fn unparseable_timestamp_falls_back() {
    let msg = Message::broadcast("bob", "hi").with_timestamp("yesterday");
    assert_eq!(format_display(&msg, "alice"), "[--:--] bob: hi");
}
