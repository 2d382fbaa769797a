use super::{ApiError, AppState};
use crate::backend::CacheBackend;
use crate::listing::Listing;
use crate::repository::DataRepository;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// Public projection of a [`Listing`].
///
/// Numbers and timestamps are encoded the way existing API consumers
/// expect: `price` as a two-place decimal string, `created_at` as ISO 8601
/// with millisecond precision (dropped when zero) and a `Z` suffix.
///
/// `price` is an `f64` read from a `numeric` column, so only whole amounts
/// up to 2^53 and cents well below that are exact; the string is rounded to
/// the nearest cent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListingSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(serialize_with = "decimal_string")]
    pub price: f64,
    pub location: String,
    #[serde(serialize_with = "iso8601")]
    pub created_at: DateTime<Utc>,
}

impl From<&Listing> for ListingSummary {
    fn from(listing: &Listing) -> Self {
        ListingSummary {
            id: listing.id,
            title: listing.title.clone(),
            description: listing.description.clone(),
            price: listing.price,
            location: listing.location.clone(),
            created_at: listing.created_at,
        }
    }
}

/// Body of `GET /properties/`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertyList {
    pub properties: Vec<ListingSummary>,
}

impl From<&[Listing]> for PropertyList {
    fn from(listings: &[Listing]) -> Self {
        PropertyList {
            properties: listings.iter().map(ListingSummary::from).collect(),
        }
    }
}

fn decimal_string<S: Serializer>(price: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{:.2}", price))
}

fn iso8601<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    let precision = if at.timestamp_subsec_micros() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Millis
    };
    serializer.serialize_str(&at.to_rfc3339_opts(precision, true))
}

/// `GET /properties/`
pub async fn property_list<B, R>(
    State(state): State<AppState<B, R>>,
) -> Result<Json<PropertyList>, ApiError>
where
    B: CacheBackend,
    R: DataRepository<Listing>,
{
    let listings = state.listings.get_all_listings().await?;
    Ok(Json(PropertyList::from(listings.as_slice())))
}

/// `GET /health`
pub async fn health<B, R>(State(state): State<AppState<B, R>>) -> (StatusCode, Json<Value>)
where
    B: CacheBackend,
    R: DataRepository<Listing>,
{
    match state.listings.backend().health_check().await {
        Ok(true) => (StatusCode::OK, Json(json!({"status": "healthy"}))),
        Ok(false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "degraded"})),
        ),
        Err(e) => {
            warn!("⚠ Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "degraded"})),
            )
        }
    }
}
