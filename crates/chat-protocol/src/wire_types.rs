//! Low-level wire constants.
//!
//! The actual encode/decode logic lives in `json_codec` and `framing`.

/// Size of the stream length prefix (u32, big-endian).
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Largest stream frame payload accepted by default (64 KiB).
///
/// Anything longer is a framing violation and closes the connection.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Largest datagram payload (max UDP payload over IPv4).
pub const MAX_DATAGRAM_LEN: usize = 65_507;

/// Default port for both transports.
pub const DEFAULT_PORT: u16 = 5000;
