/// Application name
pub const APP_NAME: &str = "Orkiv";

/// Seconds allowed for the connect + authenticate handshake
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Seconds an outbound message or presence may wait on the transport
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;

/// Milliseconds granted to the transport for a graceful close
pub const DEFAULT_DISCONNECT_GRACE_MS: u64 = 2_000;

/// Capacity of the transport event and session event channels
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Priority assumed when a presence carries none
pub const DEFAULT_PRIORITY: i8 = 0;

/// Sender label used for locally sent messages
pub const ME_LABEL: &str = "Me";

/// Timestamp format of a rendered chat line
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";
