//! Incoming request type and the HTTP/1.x head parser.

use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Version};

use crate::error::{GatewayError, Result};

/// An incoming HTTP request, parsed from the raw TCP stream.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: String,
    version: Version,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>, version: Version) -> Self {
        Self {
            method,
            target: target.into(),
            version,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw request target as sent by the client, query string included.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    /// Whether the client asked to keep the connection open.
    ///
    /// An explicit `Connection: close` or `Connection: keep-alive` token
    /// wins; otherwise HTTP/1.1 defaults to keep-alive and HTTP/1.0 to close.
    pub fn keep_alive(&self) -> bool {
        let tokens = self
            .headers
            .get_all(CONNECTION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim);

        let mut keep_alive = self.version == Version::HTTP_11;
        for token in tokens {
            if token.eq_ignore_ascii_case("close") {
                return false;
            }
            if token.eq_ignore_ascii_case("keep-alive") {
                keep_alive = true;
            }
        }
        keep_alive
    }

    /// Whether the body uses chunked transfer coding, which takes precedence
    /// over `Content-Length`.
    pub fn is_chunked(&self) -> bool {
        self.headers
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|coding| !coding.is_empty())
            .last()
            .is_some_and(|coding| coding.eq_ignore_ascii_case("chunked"))
    }

    /// Declared body length, zero when absent.
    pub fn content_length(&self) -> Result<usize> {
        match self.headers.get(CONTENT_LENGTH) {
            None => Ok(0),
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| {
                    GatewayError::MalformedRequest(format!("invalid content-length: {value:?}"))
                }),
        }
    }

    /// Parses a request head (request line and headers, without the final
    /// blank line).
    pub fn parse_head(head: &[u8]) -> Result<Self> {
        let head = std::str::from_utf8(head)
            .map_err(|_| GatewayError::MalformedRequest("head is not valid UTF-8".to_string()))?;

        let mut lines = head.split("\r\n");
        let request_line = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| GatewayError::MalformedRequest("missing request line".to_string()))?;

        let mut parts = request_line.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(GatewayError::MalformedRequest(format!(
                "bad request line: {request_line:?}"
            )));
        };

        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| GatewayError::MalformedRequest(format!("bad method: {method:?}")))?;

        // Origin-form is what the router understands; absolute-form and the
        // rest are kept verbatim and answered by the router.
        if target.is_empty() {
            return Err(GatewayError::MalformedRequest(
                "empty request target".to_string(),
            ));
        }

        let version = match version {
            "HTTP/1.1" => Version::HTTP_11,
            "HTTP/1.0" => Version::HTTP_10,
            other => {
                return Err(GatewayError::MalformedRequest(format!(
                    "unsupported version: {other:?}"
                )))
            }
        };

        let mut request = Request::new(method, target, version);
        for line in lines.filter(|line| !line.is_empty()) {
            let (name, value) = line.split_once(':').ok_or_else(|| {
                GatewayError::MalformedRequest(format!("bad header line: {line:?}"))
            })?;
            let name = HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|e| GatewayError::MalformedRequest(format!("bad header name: {e}")))?;
            let value = HeaderValue::from_str(value.trim())
                .map_err(|e| GatewayError::MalformedRequest(format!("bad header value: {e}")))?;
            request.headers.append(name, value);
        }

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_line_and_headers() {
        let request = Request::parse_head(
            b"POST /makeshort/http%3A%2F%2Fa.com HTTP/1.1\r\nHost: x\r\nContent-Length: 3",
        )
        .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.target(), "/makeshort/http%3A%2F%2Fa.com");
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.headers().get("host").unwrap(), "x");
        assert_eq!(request.content_length().unwrap(), 3);
    }

    #[test]
    fn keeps_query_string_in_target() {
        let request = Request::parse_head(b"GET /makeshort/a.com/?q=1 HTTP/1.1").unwrap();
        assert_eq!(request.target(), "/makeshort/a.com/?q=1");
    }

    #[test]
    fn keep_alive_defaults_follow_version() {
        let http11 = Request::parse_head(b"GET / HTTP/1.1").unwrap();
        let http10 = Request::parse_head(b"GET / HTTP/1.0").unwrap();

        assert!(http11.keep_alive());
        assert!(!http10.keep_alive());
    }

    #[test]
    fn connection_header_overrides_default() {
        let close = Request::parse_head(b"GET / HTTP/1.1\r\nConnection: close").unwrap();
        let keep = Request::parse_head(b"GET / HTTP/1.0\r\nconnection: Keep-Alive").unwrap();
        let mixed =
            Request::parse_head(b"GET / HTTP/1.1\r\nConnection: Upgrade, close").unwrap();

        assert!(!close.keep_alive());
        assert!(keep.keep_alive());
        assert!(!mixed.keep_alive());
    }

    #[test]
    fn missing_content_length_is_zero() {
        let request = Request::parse_head(b"GET / HTTP/1.1").unwrap();
        assert_eq!(request.content_length().unwrap(), 0);
    }

    #[test]
    fn rejects_malformed_heads() {
        let heads: [&[u8]; 8] = [
            b"",
            b"GET",
            b"GET /",
            b"GET / HTTP/2.0",
            b"GET / HTTP/1.1 extra",
            b"GET  HTTP/1.1",
            b"GET / HTTP/1.1\r\nno-colon-here",
            b"G\xffT / HTTP/1.1",
        ];
        for head in heads {
            assert!(
                matches!(
                    Request::parse_head(head),
                    Err(GatewayError::MalformedRequest(_))
                ),
                "accepted {head:?}"
            );
        }
    }

    #[test]
    fn keeps_absolute_form_target() {
        let request =
            Request::parse_head(b"GET http://test/health HTTP/1.1\r\nHost: test").unwrap();
        assert_eq!(request.target(), "http://test/health");
    }

    #[test]
    fn detects_chunked_transfer_coding() {
        let chunked =
            Request::parse_head(b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip, Chunked").unwrap();
        let gzip_only = Request::parse_head(b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip").unwrap();
        let plain = Request::parse_head(b"POST / HTTP/1.1\r\nContent-Length: 3").unwrap();

        assert!(chunked.is_chunked());
        assert!(!gzip_only.is_chunked());
        assert!(!plain.is_chunked());
    }

    #[test]
    fn rejects_bad_content_length() {
        let request = Request::parse_head(b"POST / HTTP/1.1\r\nContent-Length: lots").unwrap();
        assert!(matches!(
            request.content_length(),
            Err(GatewayError::MalformedRequest(_))
        ));
    }
}
