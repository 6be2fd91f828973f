//! Cached fetch client for anime catalog APIs.
//!
//! All upstream traffic goes through one [`CachedClient`], which serves fresh
//! responses from memory and throttles cache misses. [`CatalogSource`]
//! implementations for Jikan and Aniwatch build URLs on top of it and
//! normalize responses into the shared models.

pub mod aniwatch;
pub mod api;
pub mod catalog;
pub mod jikan;

pub use aniwatch::AniwatchCatalog;
pub use api::{CacheStats, CachedClient, FetchError, FetchSettings, RateLimiter, ReqwestTransport, Transport};
pub use catalog::{CatalogError, CatalogSource};
pub use jikan::JikanCatalog;
