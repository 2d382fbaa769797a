//! HTTP surface: the cached listing endpoint and a health check.
//!
//! ```text
//! GET /properties/   {"properties": [...]}   page-cached
//! GET /health        {"status": "..."}       never cached
//! ```

mod handlers;
mod page_cache;

pub use handlers::{health, property_list, ListingSummary, PropertyList};
pub use page_cache::{cache_page, CachedPage, PageCache};

use crate::backend::CacheBackend;
use crate::config::CacheSettings;
use crate::error::Error;
use crate::listing::Listing;
use crate::repository::DataRepository;
use crate::service::ListingService;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::json;

/// Shared state handed to every handler.
pub struct AppState<B: CacheBackend, R> {
    pub listings: ListingService<B, R>,
    pub pages: PageCache<B>,
}

impl<B: CacheBackend, R> Clone for AppState<B, R> {
    fn clone(&self) -> Self {
        AppState {
            listings: self.listings.clone(),
            pages: self.pages.clone(),
        }
    }
}

impl<B, R> AppState<B, R>
where
    B: CacheBackend,
    R: DataRepository<Listing>,
{
    /// Listing data and cached pages share `backend`.
    pub fn new(backend: B, repository: R, settings: &CacheSettings) -> Self {
        AppState {
            listings: ListingService::new(backend.clone(), repository, settings),
            pages: PageCache::new(backend, settings.keys(), settings.page_ttl()),
        }
    }
}

/// Build the application router.
pub fn router<B, R>(state: AppState<B, R>) -> Router
where
    B: CacheBackend,
    R: DataRepository<Listing> + 'static,
{
    let cached = Router::new()
        .route("/properties/", get(property_list::<B, R>))
        .route_layer(middleware::from_fn_with_state(
            state.pages.clone(),
            cache_page::<B>,
        ));

    Router::new()
        .merge(cached)
        .route("/health", get(health::<B, R>))
        .with_state(state)
}

/// Handler error rendered as `500` with a JSON body.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("✗ Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal server error"})),
        )
            .into_response()
    }
}
