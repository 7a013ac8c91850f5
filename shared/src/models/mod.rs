//! Data models
//!
//! Shared between the storefront service and its clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are UUID v4, all amounts are `i64` minor units.

pub mod cart;
pub mod discount_code;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use cart::*;
pub use discount_code::*;
pub use order::*;
pub use product::*;
pub use user::*;
