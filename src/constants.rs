// src/constants.rs

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_BIND_PORT: u16 = 2121;

/// Longest control line accepted before the session answers 500.
pub const DEFAULT_MAX_LINE_BYTES: usize = 8192;

/// Seconds a data command waits for the client to dial the PASV port.
pub const DEFAULT_DATA_TIMEOUT_SECS: u64 = 30;

/// Chunk size for file transfers on the data connection.
pub const TRANSFER_BUFFER_SIZE: usize = 64 * 1024;

/// Fixed SYST reply body.
pub const SYST_TYPE: &str = "UNIX Type: L8";
