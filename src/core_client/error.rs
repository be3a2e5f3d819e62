use thiserror::Error;

use crate::core_proto::ReplyError;

/// Everything that can go wrong on a client connection, split the way
/// callers want to react: connection-level, protocol-level, and the
/// three reply-carrying rejections.
#[derive(Debug, Error)]
pub enum FtpError {
    /// The control channel could not be opened or was lost.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The server said something the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Login was rejected.
    #[error("authentication rejected: {code} {text}")]
    Auth { code: u16, text: String },

    /// A non-transfer command drew a 4xx/5xx reply.
    #[error("command failed: {code} {text}")]
    Command { code: u16, text: String },

    /// A data command failed, either by reply or locally mid-stream.
    /// `code` is 0 when the failure happened on this side.
    #[error("transfer failed: {code} {text}")]
    Transfer { code: u16, text: String },
}

impl From<ReplyError> for FtpError {
    fn from(e: ReplyError) -> Self {
        match e {
            ReplyError::Closed => FtpError::Connection(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )),
            ReplyError::Malformed(line) => FtpError::Protocol(format!("malformed reply: {}", line)),
            ReplyError::Io(e) => FtpError::Connection(e),
        }
    }
}
