use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Transport-level failures. None of these produce a response: the
/// connection is simply closed.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection closed before a full request was received")]
    ConnectionClosed,
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },
    #[error("request body of {length} bytes exceeds {limit} bytes")]
    BodyTooLarge { length: usize, limit: usize },
    #[error("connection idle for longer than {0:?}")]
    Timeout(std::time::Duration),
}
