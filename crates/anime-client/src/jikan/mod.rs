//! Jikan API v4 backend (generic REST anime database).
//!
//! Responses use `{ data, pagination }` envelopes.

pub mod catalog;
pub mod types;

pub use catalog::JikanCatalog;
