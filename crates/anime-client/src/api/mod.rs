//! Cached, rate-limited access to the upstream anime APIs.
//!
//! This module is backend agnostic: it fetches fully-formed URLs and hands
//! back parsed JSON. URL templates and response mapping live with each
//! backend.

pub mod cache;
pub mod client;
pub mod error;
pub mod rate_limiter;
pub mod transport;

pub use cache::{CacheStats, ResponseCache};
pub use client::{CachedClient, FetchSettings};
pub use error::FetchError;
pub use rate_limiter::RateLimiter;
pub use transport::{HttpResponse, ReqwestTransport, Transport};
