//! # property-cache
//!
//! Caching helpers for a property listing service backed by Postgres and
//! Redis.
//!
//! ## Features
//!
//! - **Read-through listing cache:** the whole listing collection is kept
//!   under one key and reloaded from the datastore on a miss
//! - **Keyspace metrics:** hit/miss counters and ratios from Redis `INFO`
//! - **Cached HTTP endpoint:** `GET /properties/` behind a full-response
//!   page cache
//! - **Backend agnostic:** in-memory and Redis backends behind one trait
//!
//! ## Quick Start
//!
//! ```ignore
//! use property_cache::{
//!     backend::InMemoryBackend, config::Settings, repository::InMemoryRepository,
//!     ListingService,
//! };
//!
//! let settings = Settings::default();
//! let service = ListingService::new(
//!     InMemoryBackend::new(),
//!     InMemoryRepository::with_records(listings),
//!     &settings.cache,
//! );
//!
//! let all = service.get_all_listings().await?;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod expander;
pub mod http;
pub mod key;
pub mod listing;
pub mod observability;
pub mod repository;
pub mod serialization;
pub mod service;
pub mod stats;
pub mod strategy;

// Re-exports for convenience
pub use backend::{CacheBackend, StatsSource};
pub use entity::CacheEntity;
pub use error::{Error, Result};
pub use expander::CacheExpander;
pub use listing::Listing;
pub use repository::DataRepository;
pub use service::ListingService;
pub use stats::{get_cache_metrics, MetricsReport, MetricsSnapshot};
pub use strategy::CacheStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
