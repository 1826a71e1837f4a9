//! Search backend client for estail
//!
//! This crate defines the [`SearchBackend`] contract the polling engine is
//! written against, and [`EsClient`], its implementation over the
//! Elasticsearch HTTP API.

mod backend;
mod client;
mod error;

pub use backend::{SearchBackend, SearchPage, SearchRequest};
pub use client::{EsClient, EsClientConfig};
pub use error::{Result, SearchError};

// Re-export types used in our public API
pub use estail_types::LogDocument;
