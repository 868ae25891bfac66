//! Upload API: issues scoped, short-lived credentials for direct uploads to storage

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Upload credential issuance
pub mod credential;

/// S3 presigning
pub mod media_storage;

/// Request extractors
pub mod middleware;

#[allow(missing_docs)]
pub mod routes;

/// HTTP server setup
pub mod server;

/// Shared API types
pub mod types;
