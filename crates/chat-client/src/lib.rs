//! chat-client
//!
//! Client side of the chat relay: a connection over TCP or UDP exposing
//! `connect` / `send` / `receive` / `close`, plus the console command
//! parser and message rendering used by the `chat-client` binary.

pub mod command;
pub mod connection;
pub mod error;
pub mod render;

pub use command::{parse_line, Command, HELP};
pub use connection::{ChatClient, ClientConfig, ClientReceiver, ClientSender, Protocol};
pub use error::{ClientError, CommandError};
pub use render::format_display;
