//! Per-connection request lifecycle.
//!
//! A [`Connection`] owns one accepted stream and walks it through
//!
//! ```text
//! Reading ──► Dispatching ──► Writing ──► Closed
//!    │                                      ▲
//!    └──────── I/O error / bad request ─────┘
//! ```
//!
//! Exactly one request is served. After the response is flushed the write
//! side is shut down (half-close) so the peer sees EOF while it can still
//! drain what was sent.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::{GatewayError, Result};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// Upper bound on request line plus headers.
pub const MAX_HEAD_BYTES: usize = 8 * 1024;
/// Upper bound on a request body, declared or chunked. Bodies are read and
/// discarded.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const LINE_TERMINATOR: &[u8] = b"\r\n";
const READ_CHUNK: usize = 4 * 1024;

/// Where a connection is in its lifecycle.
#[derive(Debug)]
pub enum ConnectionState {
    /// Waiting for a complete request.
    Reading,
    /// A request is parsed and about to be routed.
    Dispatching(Request),
    /// A response is ready to be sent.
    Writing(Response),
    /// Terminal. The stream is no longer used.
    Closed,
}

/// One accepted connection and the router it dispatches to.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    router: Arc<Router>,
    io_timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    pub fn new(stream: S, peer: SocketAddr, router: Arc<Router>, io_timeout: Duration) -> Self {
        Self {
            stream,
            peer,
            router,
            io_timeout,
        }
    }

    /// Drives the state machine until [`ConnectionState::Closed`].
    pub async fn run(mut self) {
        let mut state = ConnectionState::Reading;

        loop {
            state = match state {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(request) => ConnectionState::Dispatching(request),
                    Err(err) => {
                        debug!(peer = %self.peer, error = %err, "dropping connection without response");
                        ConnectionState::Closed
                    }
                },
                ConnectionState::Dispatching(request) => {
                    let response = self
                        .router
                        .route(&request)
                        .await
                        .for_request(request.version(), request.keep_alive());
                    ConnectionState::Writing(response)
                }
                ConnectionState::Writing(response) => {
                    if let Err(err) = self.write_response(&response).await {
                        debug!(peer = %self.peer, error = %err, "failed to send response");
                    }
                    ConnectionState::Closed
                }
                ConnectionState::Closed => break,
            };
            trace!(peer = %self.peer, state = ?state, "connection state");
        }
    }

    async fn read_request(&mut self) -> Result<Request> {
        let mut buffer = Vec::with_capacity(READ_CHUNK);

        let head_end = loop {
            if let Some(pos) = find_terminator(&buffer) {
                break pos;
            }
            if buffer.len() >= MAX_HEAD_BYTES {
                return Err(GatewayError::HeadTooLarge {
                    limit: MAX_HEAD_BYTES,
                });
            }
            if self.read_chunk(&mut buffer).await? == 0 {
                return Err(GatewayError::ConnectionClosed);
            }
        };

        if head_end > MAX_HEAD_BYTES {
            return Err(GatewayError::HeadTooLarge {
                limit: MAX_HEAD_BYTES,
            });
        }

        let mut request = Request::parse_head(&buffer[..head_end])?;
        let rest = buffer.split_off(head_end + HEAD_TERMINATOR.len());

        let body = if request.is_chunked() {
            self.read_chunked_body(rest).await?
        } else {
            self.read_sized_body(rest, request.content_length()?).await?
        };
        request.set_body(body);

        Ok(request)
    }

    async fn read_sized_body(&mut self, mut body: Vec<u8>, length: usize) -> Result<Vec<u8>> {
        if length > MAX_BODY_BYTES {
            return Err(GatewayError::BodyTooLarge {
                length,
                limit: MAX_BODY_BYTES,
            });
        }

        while body.len() < length {
            if self.read_chunk(&mut body).await? == 0 {
                return Err(GatewayError::ConnectionClosed);
            }
        }
        body.truncate(length);
        Ok(body)
    }

    /// Decodes a `Transfer-Encoding: chunked` body. `raw` holds whatever
    /// followed the head in the first reads. Trailers are discarded.
    async fn read_chunked_body(&mut self, mut raw: Vec<u8>) -> Result<Vec<u8>> {
        let mut body = Vec::new();

        loop {
            let line_end = self.read_line(&mut raw).await?;
            let size = parse_chunk_size(&raw[..line_end])?;
            raw.drain(..line_end + LINE_TERMINATOR.len());

            if size == 0 {
                loop {
                    let trailer_end = self.read_line(&mut raw).await?;
                    raw.drain(..trailer_end + LINE_TERMINATOR.len());
                    if trailer_end == 0 {
                        return Ok(body);
                    }
                }
            }

            if size > MAX_BODY_BYTES - body.len() {
                return Err(GatewayError::BodyTooLarge {
                    length: body.len().saturating_add(size),
                    limit: MAX_BODY_BYTES,
                });
            }

            let framed = size + LINE_TERMINATOR.len();
            while raw.len() < framed {
                if self.read_chunk(&mut raw).await? == 0 {
                    return Err(GatewayError::ConnectionClosed);
                }
            }
            if &raw[size..framed] != LINE_TERMINATOR {
                return Err(GatewayError::MalformedRequest(
                    "chunk data not followed by CRLF".to_string(),
                ));
            }
            body.extend_from_slice(&raw[..size]);
            raw.drain(..framed);
        }
    }

    /// Reads until `raw` holds a CRLF and returns its offset.
    async fn read_line(&mut self, raw: &mut Vec<u8>) -> Result<usize> {
        loop {
            if let Some(pos) = raw
                .windows(LINE_TERMINATOR.len())
                .position(|window| window == LINE_TERMINATOR)
            {
                return Ok(pos);
            }
            if raw.len() >= MAX_HEAD_BYTES {
                return Err(GatewayError::HeadTooLarge {
                    limit: MAX_HEAD_BYTES,
                });
            }
            if self.read_chunk(raw).await? == 0 {
                return Err(GatewayError::ConnectionClosed);
            }
        }
    }

    async fn read_chunk(&mut self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let read = with_timeout(self.io_timeout, self.stream.read(&mut chunk)).await??;
        buffer.extend_from_slice(&chunk[..read]);
        Ok(read)
    }

    async fn write_response(&mut self, response: &Response) -> Result<()> {
        with_timeout(self.io_timeout, response.write_to(&mut self.stream)).await??;
        with_timeout(self.io_timeout, self.stream.shutdown()).await??;
        Ok(())
    }
}

async fn with_timeout<F: Future>(duration: Duration, task: F) -> Result<F::Output> {
    tokio::time::timeout(duration, task)
        .await
        .map_err(|_| GatewayError::Timeout(duration))
}

/// Parses a chunk-size line, ignoring chunk extensions.
fn parse_chunk_size(line: &[u8]) -> Result<usize> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|line| line.split(';').next())
        .map(str::trim)
        .filter(|size| !size.is_empty())
        .and_then(|size| usize::from_str_radix(size, 16).ok())
        .ok_or_else(|| {
            GatewayError::MalformedRequest(format!(
                "bad chunk size line: {:?}",
                String::from_utf8_lossy(line)
            ))
        })
}

fn find_terminator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
}
