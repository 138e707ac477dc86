//! How incoming messages look on the console.

use chat_core::{Message, MessageKind, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;

/// One display line for `msg`, as seen by participant `me`.
pub fn format_display(msg: &Message, me: &str) -> String {
    match msg.kind() {
        MessageKind::Private { recipient } if msg.sender() == me => format!(
            "[{}] (private to {}): {}",
            clock(msg.timestamp()),
            recipient,
            msg.content()
        ),
        MessageKind::Private { .. } => format!(
            "[{}] (private from {}): {}",
            clock(msg.timestamp()),
            msg.sender(),
            msg.content()
        ),
        MessageKind::ServerNotice | MessageKind::RegisterOk => format!("[SYSTEM] {}", msg.content()),
        MessageKind::UserList => format!("[SYSTEM] connected users: {}", msg.content()),
        MessageKind::Error => format!("[ERROR] {}", msg.content()),
        MessageKind::RegisterFail => match msg.reject_reason() {
            Some(reason) => format!("[ERROR] registration rejected: {}", reason.describe()),
            None => format!("[ERROR] registration rejected: {}", msg.content()),
        },
        _ => format!(
            "[{}] {}: {}",
            clock(msg.timestamp()),
            msg.sender(),
            msg.content()
        ),
    }
}

/// `HH:MM:SS` part of a wire timestamp.
fn clock(timestamp: &str) -> String {
    match NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT) {
        Ok(t) => t.format("%H:%M:%S").to_string(),
        Err(_) => "--:--".to_string(),
    }
}
