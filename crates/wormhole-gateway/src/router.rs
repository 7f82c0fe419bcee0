//! Maps a request target onto the shortener and renders the reply.
//!
//! Dispatch happens on the raw target, in this order:
//!
//! | Target                  | Result                                    |
//! |-------------------------|-------------------------------------------|
//! | `/makeshort/<url>`      | `200`, `<domain>/<code>`                  |
//! | `/` or `/health`        | `200`, service banner                     |
//! | `/<alphanumeric code>`  | `200` original URL, or `404`              |
//! | anything else           | `400`, usage message                      |
//!
//! A shortener failure on any route becomes a `500` carrying its message.

use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, error};
use wormhole_core::{ShortCode, Shortener, ShortenerError};

use crate::decode::percent_decode;
use crate::request::Request;
use crate::response::Response;

pub const BANNER: &str = "URL Shortener Service is running!\n\n\
                          Usage:\n  \
                          POST/GET /makeshort/<url>  - Shorten a URL\n  \
                          GET /<code> - Decode a short URL";

pub const USAGE: &str = "Invalid request. Use /makeshort/<url> or /<code>";

pub const NOT_FOUND: &str = "Short URL not found";

const SHORTEN_PREFIX: &str = "/makeshort/";

/// Where a request target is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    /// Shorten the still percent-encoded URL.
    Shorten(&'a str),
    /// Service banner.
    Banner,
    /// Resolve a short code.
    Resolve(ShortCode),
    /// No rule matched.
    Invalid,
}

impl<'a> Route<'a> {
    pub fn parse(target: &'a str) -> Self {
        if let Some(url) = target
            .strip_prefix(SHORTEN_PREFIX)
            .filter(|url| !url.is_empty())
        {
            return Route::Shorten(url);
        }

        if target == "/" || target == "/health" {
            return Route::Banner;
        }

        match target.strip_prefix('/').map(ShortCode::new) {
            Some(Ok(code)) => Route::Resolve(code),
            _ => Route::Invalid,
        }
    }
}

/// Request router shared by every connection.
#[derive(Clone)]
pub struct Router {
    shortener: Arc<dyn Shortener>,
    domain: String,
}

impl Router {
    /// `domain` is the public prefix put in front of returned codes.
    pub fn new(shortener: Arc<dyn Shortener>, domain: impl Into<String>) -> Self {
        Self {
            shortener,
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Produces the response for `request`. Never fails: shortener errors
    /// are rendered as `500`.
    pub async fn route(&self, request: &Request) -> Response {
        let response = match self.dispatch(request.target()).await {
            Ok(response) => response,
            Err(err) => {
                error!(request_target = request.target(), error = %err, "request failed");
                Response::text(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {err}"))
            }
        };

        debug!(
            method = %request.method(),
            request_target = request.target(),
            status = response.status().as_u16(),
            "request handled"
        );
        response
    }

    async fn dispatch(&self, target: &str) -> Result<Response, ShortenerError> {
        match Route::parse(target) {
            Route::Shorten(encoded) => {
                let original_url = percent_decode(encoded);
                let code = self.shortener.shorten(&original_url).await?;
                Ok(Response::ok(code.to_url(&self.domain)))
            }
            Route::Banner => Ok(Response::ok(BANNER)),
            Route::Resolve(code) => Ok(match self.shortener.resolve(&code).await? {
                Some(record) => Response::ok(record.original_url),
                None => Response::text(StatusCode::NOT_FOUND, NOT_FOUND),
            }),
            Route::Invalid => Ok(Response::text(StatusCode::BAD_REQUEST, USAGE)),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http::{Method, Version};
    use wormhole_core::{InMemoryRepository, UrlRecord};
    use wormhole_generator::RandomGenerator;
    use wormhole_shortener::ShortenerService;

    fn router() -> Router {
        let service = ShortenerService::new(InMemoryRepository::new(), RandomGenerator::default());
        Router::new(Arc::new(service), "localhost:5000")
    }

    fn get(target: &str) -> Request {
        Request::new(Method::GET, target, Version::HTTP_11)
    }

    #[test]
    fn parse_routes() {
        assert_eq!(
            Route::parse("/makeshort/http%3A%2F%2Fa.com"),
            Route::Shorten("http%3A%2F%2Fa.com")
        );
        assert_eq!(
            Route::parse("/makeshort/a.com/x?y=1"),
            Route::Shorten("a.com/x?y=1")
        );
        assert_eq!(Route::parse("/"), Route::Banner);
        assert_eq!(Route::parse("/health"), Route::Banner);
        assert_eq!(
            Route::parse("/aB3xY9z"),
            Route::Resolve(ShortCode::new("aB3xY9z").unwrap())
        );
        assert_eq!(
            Route::parse("/makeshort"),
            Route::Resolve(ShortCode::new("makeshort").unwrap())
        );
        assert_eq!(Route::parse("/makeshort/"), Route::Invalid);
        assert_eq!(Route::parse("/doesnotexist/also/not"), Route::Invalid);
        assert_eq!(Route::parse("/abc?x=1"), Route::Invalid);
        assert_eq!(Route::parse("/abc-def"), Route::Invalid);
        assert_eq!(Route::parse("/health/"), Route::Invalid);
        assert_eq!(Route::parse("http://test/health"), Route::Invalid);
        assert_eq!(Route::parse("*"), Route::Invalid);
    }

    #[tokio::test]
    async fn shorten_decodes_before_storing() {
        let router = router();

        let response = router
            .route(&get("/makeshort/http%3A%2F%2Fa.com%2Fx"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let short_url = response.body().to_string();
        let code = short_url.strip_prefix("localhost:5000/").unwrap();
        assert_eq!(code.len(), 7);

        let resolved = router.route(&get(&format!("/{code}"))).await;
        assert_eq!(resolved.status(), StatusCode::OK);
        assert_eq!(resolved.body(), "http://a.com/x");
    }

    #[tokio::test]
    async fn shorten_is_idempotent_over_http() {
        let router = router();

        let first = router.route(&get("/makeshort/https://a.com/x")).await;
        let second = router
            .route(&get("/makeshort/https%3A%2F%2Fa.com%2Fx"))
            .await;

        assert_eq!(first.body(), second.body());
    }

    #[tokio::test]
    async fn post_shortens_too() {
        let router = router();

        let response = router
            .route(&Request::new(
                Method::POST,
                "/makeshort/https://a.com",
                Version::HTTP_11,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().starts_with("localhost:5000/"));
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let response = router().route(&get("/zzzzzzz")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), NOT_FOUND);
    }

    #[tokio::test]
    async fn banner_on_root_and_health() {
        let router = router();

        for target in ["/", "/health"] {
            let response = router.route(&get(target)).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.body(), BANNER);
        }

        let head = router
            .route(&Request::new(Method::HEAD, "/health", Version::HTTP_10))
            .await;
        assert_eq!(head.body(), BANNER);
    }

    #[tokio::test]
    async fn anything_else_is_bad_request() {
        let router = router();

        for target in ["/doesnotexist/also/not", "/makeshort/", "/a_b", "/x?y"] {
            let response = router.route(&get(target)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{target}");
            assert_eq!(response.body(), USAGE);
        }
    }

    #[test]
    fn banner_text() {
        assert_eq!(
            BANNER,
            "URL Shortener Service is running!\n\nUsage:\n  \
             POST/GET /makeshort/<url>  - Shorten a URL\n  GET /<code> - Decode a short URL"
        );
    }

    struct FailingShortener;

    #[async_trait]
    impl Shortener for FailingShortener {
        async fn shorten(&self, _original_url: &str) -> Result<ShortCode, ShortenerError> {
            Err(ShortenerError::CapacityExhausted { attempts: 10 })
        }

        async fn resolve(&self, _code: &ShortCode) -> Result<Option<UrlRecord>, ShortenerError> {
            Err(ShortenerError::Storage("database is locked".to_string()))
        }
    }

    #[tokio::test]
    async fn shortener_failures_become_500() {
        let router = Router::new(Arc::new(FailingShortener), "localhost:5000");

        let shorten = router.route(&get("/makeshort/https://a.com")).await;
        assert_eq!(shorten.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(shorten.body().starts_with("Error: failed to generate a unique short code"));

        let resolve = router.route(&get("/abc1234")).await;
        assert_eq!(resolve.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resolve.body(), "Error: storage error: database is locked");

        // Static routes never touch the shortener.
        let banner = router.route(&get("/health")).await;
        assert_eq!(banner.status(), StatusCode::OK);
    }
}
