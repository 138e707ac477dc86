//! Configuration for the chat relay.
//!
//! Defaults can be overridden via environment variables (and then by the
//! binary's command-line flags):
//!
//! - `CHAT_BIND_ADDR`           (default: "0.0.0.0")
//! - `CHAT_PORT`                (default: "5000")
//! - `CHAT_MAX_CLIENTS`         (default: "5")
//! - `CHAT_TRANSPORT`           (default: "tcp"; "udp" or "both")
//! - `CHAT_REGISTER_TIMEOUT_MS` (default: "5000")
//! - `CHAT_SEND_TIMEOUT_MS`     (default: "2000")
//! - `CHAT_IDLE_TIMEOUT_SECS`   (default: "0", disabled)

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chat_protocol::wire_types::{DEFAULT_PORT, MAX_FRAME_LEN};
use thiserror::Error;

use crate::transport::stream::StreamSettings;

/// Which transports the relay serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Tcp,
    Udp,
    /// TCP listener and UDP socket on the same port, one shared registry.
    Both,
}

impl TransportMode {
    pub fn uses_stream(&self) -> bool {
        matches!(self, TransportMode::Tcp | TransportMode::Both)
    }

    pub fn uses_datagram(&self) -> bool {
        matches!(self, TransportMode::Udp | TransportMode::Both)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportMode::Tcp => "tcp",
            TransportMode::Udp => "udp",
            TransportMode::Both => "both",
        })
    }
}

impl FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(TransportMode::Tcp),
            "udp" => Ok(TransportMode::Udp),
            "both" => Ok(TransportMode::Both),
            _ => Err(ConfigError::UnknownTransport(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown transport {0:?} (expected tcp, udp or both)")]
    UnknownTransport(String),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// Port for the TCP listener and/or UDP socket.
    pub port: u16,

    /// Maximum number of simultaneously registered participants.
    pub max_clients: usize,

    pub transport: TransportMode,

    /// How long a new stream connection has to send REGISTER.
    pub register_timeout: Duration,

    /// Bound on any single send to one participant.
    pub send_timeout: Duration,

    /// Datagram participants silent for longer than this are dropped.
    pub idle_timeout: Option<Duration>,

    /// Largest stream frame accepted from a client.
    pub max_frame_len: usize,

    /// Frames queued per stream connection before sends start to wait.
    pub outbound_queue: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_clients: 5,
            transport: TransportMode::Tcp,
            register_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_secs(2),
            idle_timeout: None,
            max_frame_len: MAX_FRAME_LEN,
            outbound_queue: 64,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let bind_addr = env::var("CHAT_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = read_env_or_default("CHAT_PORT", defaults.port)?;
        let max_clients = read_env_or_default("CHAT_MAX_CLIENTS", defaults.max_clients)?;
        let transport = match env::var("CHAT_TRANSPORT") {
            Ok(val) => val.parse()?,
            Err(_) => defaults.transport,
        };
        let register_timeout_ms = read_env_or_default("CHAT_REGISTER_TIMEOUT_MS", 5_000u64)?;
        let send_timeout_ms = read_env_or_default("CHAT_SEND_TIMEOUT_MS", 2_000u64)?;
        let idle_secs = read_env_or_default("CHAT_IDLE_TIMEOUT_SECS", 0u64)?;

        let config = Config {
            bind_addr,
            port,
            max_clients,
            transport,
            register_timeout: Duration::from_millis(register_timeout_ms),
            send_timeout: Duration::from_millis(send_timeout_ms),
            idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Zero("max_clients"));
        }
        if self.register_timeout.is_zero() {
            return Err(ConfigError::Zero("register_timeout"));
        }
        if self.send_timeout.is_zero() {
            return Err(ConfigError::Zero("send_timeout"));
        }
        if self.max_frame_len == 0 {
            return Err(ConfigError::Zero("max_frame_len"));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::Zero("outbound_queue"));
        }
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            max_frame_len: self.max_frame_len,
            send_timeout: self.send_timeout,
            outbound_queue: self.outbound_queue,
        }
    }
}

fn read_env_or_default<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value: val,
        }),
        Err(_) => Ok(default),
    }
}
