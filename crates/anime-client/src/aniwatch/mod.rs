//! Aniwatch (hianime) aggregator backend.
//!
//! Responses use `{ success, data }` envelopes; a `success: false` body is
//! reported as an upstream failure even though the HTTP status is 2xx.

pub mod catalog;
pub mod types;

pub use catalog::AniwatchCatalog;
