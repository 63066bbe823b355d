//! Yandex XML search: query construction and the HTTP client.

pub mod client;
pub mod query;

pub use client::{Credentials, RawResponse, SearchClient, YandexClient};
pub use query::Query;
