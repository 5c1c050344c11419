//! REST API implementation for PhoneVault.
//!
//! Handles:
//! - HTTP endpoints with axum (record reads, multipart upserts, photo serving)
//! - API-key authentication for the record routes
//! - OpenAPI/Swagger documentation
//! - Mapping storage failures to HTTP statuses
//!
//! Uses `phonevault-core` for all storage semantics.

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod errors;
