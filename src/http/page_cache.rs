//! Full-response caching for idempotent requests.
//!
//! Successful `GET`/`HEAD` responses are stored whole (status, headers,
//! body) under a key derived from the request method, path and query, and
//! replayed until they expire. Every cached response is stamped with
//! `Cache-Control: max-age=<ttl>` and an `Expires` date so downstream caches
//! agree with ours.

use crate::backend::CacheBackend;
use crate::key::CacheKeyBuilder;
use crate::serialization::{deserialize_from_cache, serialize_for_cache};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, EXPIRES, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and for how long pages are cached.
#[derive(Clone)]
pub struct PageCache<B: CacheBackend> {
    backend: B,
    keys: CacheKeyBuilder,
    ttl: Duration,
}

impl<B: CacheBackend> PageCache<B> {
    pub fn new(backend: B, keys: CacheKeyBuilder, ttl: Duration) -> Self {
        PageCache { backend, keys, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key_for(&self, request: &Request) -> String {
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        self.keys.page(request.method().as_str(), path_and_query)
    }
}

/// A stored response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedPage {
    pub status: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

impl CachedPage {
    fn capture(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Self {
        CachedPage {
            status: status.as_u16(),
            headers: headers
                .iter()
                .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
                .collect(),
            body: body.to_vec(),
        }
    }
}

impl IntoResponse for CachedPage {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_bytes(&value),
            ) {
                headers.append(name, value);
            }
        }
        response
    }
}

/// Middleware serving and filling the page cache.
///
/// Cache failures never fail the request: a broken lookup or write is
/// logged and the response is served uncached.
pub async fn cache_page<B: CacheBackend>(
    State(cache): State<PageCache<B>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    let key = cache.key_for(&request);

    match cache.backend.get(&key).await {
        Ok(Some(bytes)) => match deserialize_from_cache::<CachedPage>(&bytes) {
            Ok(page) => {
                debug!("✓ Page cache HIT {}", key);
                return page.into_response();
            }
            Err(e) => warn!("⚠ Discarding unreadable cached page {}: {}", key, e),
        },
        Ok(None) => debug!("✗ Page cache MISS {}", key),
        Err(e) => warn!("⚠ Page cache lookup failed for {}: {}", key, e),
    }

    let response = next.run(request).await;
    if !is_cacheable(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(e) => {
            error!("✗ Failed to buffer response body for {}: {}", key, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    patch_response_headers(&mut parts.headers, cache.ttl);

    let page = CachedPage::capture(parts.status, &parts.headers, &body);
    match serialize_for_cache(&page) {
        Ok(bytes) => {
            if let Err(e) = cache.backend.set(&key, bytes, Some(cache.ttl)).await {
                warn!("⚠ Failed to store page {}: {}", key, e);
            }
        }
        Err(e) => warn!("⚠ Failed to encode page {}: {}", key, e),
    }

    Response::from_parts(parts, Body::from(body))
}

fn is_cacheable(response: &Response) -> bool {
    if response.status() != StatusCode::OK || response.headers().contains_key(SET_COOKIE) {
        return false;
    }

    !response
        .headers()
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|directive| directive.trim().to_ascii_lowercase())
        .any(|directive| directive == "private" || directive == "no-store")
}

/// Add `Expires` and `Cache-Control: max-age` unless already present.
fn patch_response_headers(headers: &mut HeaderMap, ttl: Duration) {
    if !headers.contains_key(EXPIRES) {
        let expires = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        let http_date = expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        if let Ok(value) = HeaderValue::from_str(&http_date) {
            headers.insert(EXPIRES, value);
        }
    }

    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_str(&format!("max-age={}", ttl.as_secs()))
                .unwrap_or_else(|_| HeaderValue::from_static("max-age=0")),
        );
    }
}
