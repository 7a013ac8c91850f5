//! Cart value object
//!
//! Carried in request bodies. Unit prices are client snapshots; the server
//! re-reads catalog prices before anything is charged.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum quantity of a single line
pub const MAX_LINE_QUANTITY: i32 = 99;
/// Maximum number of lines in a cart
pub const MAX_CART_LINES: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    /// Snapshot unit price in minor units
    pub unit_price: i64,
    pub quantity: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Undiscounted total at the snapshot prices
    pub fn subtotal(&self) -> i64 {
        self.lines
            .iter()
            .map(|line| line.unit_price * i64::from(line.quantity))
            .sum()
    }

    /// Structural checks: non-empty, bounded size, sane quantities and prices,
    /// no duplicate products.
    pub fn check_shape(&self) -> Result<(), &'static str> {
        if self.lines.is_empty() {
            return Err("Cart is empty");
        }
        if self.lines.len() > MAX_CART_LINES {
            return Err("Too many cart lines");
        }
        for (i, line) in self.lines.iter().enumerate() {
            if !(1..=MAX_LINE_QUANTITY).contains(&line.quantity) {
                return Err("Quantity must be between 1 and 99");
            }
            if line.unit_price <= 0 {
                return Err("Unit price must be positive");
            }
            if self.lines[..i]
                .iter()
                .any(|other| other.product_id == line.product_id)
            {
                return Err("Duplicate cart line");
            }
        }
        Ok(())
    }
}
