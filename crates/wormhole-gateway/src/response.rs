//! Outgoing plain-text response and its HTTP/1.x serialization.

use http::{StatusCode, Version};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Value of the `Server` response header.
pub const SERVER_NAME: &str = concat!("wormhole/", env!("CARGO_PKG_VERSION"));

/// An outgoing `text/plain` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    body: String,
    version: Version,
    keep_alive: bool,
}

impl Response {
    /// A response with the given status and body; HTTP/1.1, connection close.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            version: Version::HTTP_11,
            keep_alive: false,
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::text(StatusCode::OK, body)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Mirrors the protocol version and keep-alive preference of a request.
    pub fn for_request(mut self, version: Version, keep_alive: bool) -> Self {
        self.version = version;
        self.keep_alive = keep_alive;
        self
    }

    /// Serializes the status line, headers and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let version = if self.version == Version::HTTP_10 {
            "HTTP/1.0"
        } else {
            "HTTP/1.1"
        };
        let connection = if self.keep_alive { "keep-alive" } else { "close" };

        let mut out = format!(
            "{version} {} {}\r\n\
             Server: {SERVER_NAME}\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: {}\r\n\
             Connection: {connection}\r\n\
             \r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or(""),
            self.body.len(),
        )
        .into_bytes();
        out.extend_from_slice(self.body.as_bytes());
        out
    }

    pub(crate) async fn write_to<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
    ) -> std::io::Result<()> {
        writer.write_all(&self.to_bytes()).await?;
        writer.flush().await
    }
}
