//! chat-core
//!
//! Pure chat relay logic:
//! - messages (the tagged set of kinds exchanged with participants)
//! - participant name rules
//! - registration rejection reasons

pub mod message;
pub mod name;
pub mod reject;

pub use message::{now_timestamp, Message, MessageKind, SERVER_SENDER, TIMESTAMP_FORMAT};
pub use name::{validate_name, NameError, MAX_NAME_LEN};
pub use reject::RejectReason;
