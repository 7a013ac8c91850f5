//! storefront: digital-product shop back end
//!
//! - Catalog and order history for buyers
//! - Discount-code pricing and checkout through Stripe
//! - Webhook-driven order finalization and receipts
//! - Back-office API (JWT authenticated)

pub mod api;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod pricing;
pub mod reconcile;
pub mod state;
pub mod store;
pub mod stripe;

#[cfg(test)]
mod testing;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
