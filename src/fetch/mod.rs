//! Data Fetcher
//!
//! Retrieves widget documents from arbitrary JSON endpoints. Transport,
//! status, and parse failures are all surfaced as a [`FetchError`].

mod client;
mod error;

pub use client::{Fetch, FetchConfig, HttpFetcher};
pub use error::{FetchError, FetchErrorKind, FetchResult};
