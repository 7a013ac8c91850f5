//! Database access layer

pub mod discount_codes;
pub mod orders;
pub mod products;
pub mod users;
pub mod webhook_events;
