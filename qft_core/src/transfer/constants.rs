/// ALPN label negotiated by both ends of a file-transfer connection
pub const ALPN: &[u8] = b"quic-file-transfer";

/// Buffer size for payload copies (1MB)
pub const BUFFER_SIZE: usize = 1024 * 1024;

/// Largest name length the receiver will allocate for (64KB)
pub const MAX_NAME_LENGTH: u32 = 64 * 1024;

/// Exclusive upper bound of the random part of a destination name
pub const DISAMBIGUATOR_RANGE: u32 = 1000;

/// How many fresh disambiguators to try before giving up on a name
pub const CREATE_ATTEMPTS: usize = 16;

/// Fallback used when a received name has nothing usable left
pub const UNKNOWN_FILE_NAME: &str = "unknown_file";

/// Application close code: handler finished successfully
pub const CLOSE_OK: quinn::VarInt = quinn::VarInt::from_u32(0);

/// Application close code: handler failed
pub const CLOSE_FAILED: quinn::VarInt = quinn::VarInt::from_u32(1);

/// Application close code: server is shutting down
pub const CLOSE_SHUTDOWN: quinn::VarInt = quinn::VarInt::from_u32(2);
