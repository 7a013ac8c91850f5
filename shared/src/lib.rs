//! Shared types for the storefront
//!
//! Error system, API response envelope and the domain models used by the
//! service and its clients.

pub mod error;
pub mod models;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
