//! Property listing record as stored in the datastore.

use crate::entity::CacheEntity;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A property listing. Read-only from this crate's perspective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Listing {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

impl CacheEntity for Listing {
    fn cache_prefix() -> &'static str {
        "property"
    }

    fn validate(&self) -> Result<()> {
        if !self.price.is_finite() {
            return Err(Error::ValidationError(format!(
                "listing {} has a non-finite price",
                self.id
            )));
        }
        Ok(())
    }
}
