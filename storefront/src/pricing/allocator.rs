//! Cart Discount Allocator
//!
//! Turns a validated discount code into per-line discounted unit prices.
//!
//! - All-products codes discount the whole cart proportionally.
//! - Scoped codes discount the first matching line only.

use std::collections::HashMap;

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use shared::models::{Cart, DiscountCode, DiscountType};
use uuid::Uuid;

use super::calculator::{MIN_CHARGE, MINOR_UNITS, PricingError, compute_discount, scale};

/// Product id -> category ids, as read from the catalog
pub type CategoryIndex = HashMap<Uuid, Vec<Uuid>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub discounted_unit_price: i64,
}

impl AllocatedLine {
    fn undiscounted(product_id: Uuid, quantity: i32, unit_price: i64) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
            discounted_unit_price: unit_price,
        }
    }

    pub fn line_total(&self) -> i64 {
        self.discounted_unit_price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub lines: Vec<AllocatedLine>,
    /// Set for scoped codes when a line matched
    pub discounted_product_id: Option<Uuid>,
    /// Discount as computed by the algorithm. For whole-cart codes this can
    /// differ from `subtotal() - total()` by per-line rounding.
    pub total_discount: i64,
}

impl Allocation {
    /// Allocation that leaves every price untouched
    pub fn none(cart: &Cart) -> Self {
        Self {
            lines: cart
                .lines
                .iter()
                .map(|l| AllocatedLine::undiscounted(l.product_id, l.quantity, l.unit_price))
                .collect(),
            discounted_product_id: None,
            total_discount: 0,
        }
    }

    /// Undiscounted total
    pub fn subtotal(&self) -> i64 {
        self.lines
            .iter()
            .map(|l| l.unit_price * i64::from(l.quantity))
            .sum()
    }

    /// Chargeable total: sum of discounted unit price times quantity
    pub fn total(&self) -> i64 {
        self.lines.iter().map(AllocatedLine::line_total).sum()
    }

    pub fn is_discounted(&self) -> bool {
        self.total_discount > 0
    }
}

/// Allocate `code` across `cart`.
///
/// A scoped code matching no line yields [`Allocation::none`]; callers turn
/// that into a "not applicable" rejection.
pub fn allocate(
    cart: &Cart,
    code: &DiscountCode,
    categories: &CategoryIndex,
) -> Result<Allocation, PricingError> {
    if code.all_products {
        allocate_whole_cart(cart, code)
    } else {
        allocate_single_product(cart, code, categories)
    }
}

fn allocate_whole_cart(cart: &Cart, code: &DiscountCode) -> Result<Allocation, PricingError> {
    let total = cart.subtotal();
    if total <= 0 {
        return Ok(Allocation::none(cart));
    }

    let total_discount = compute_discount(total, code.discount_type, code.discount_amount)?;
    let ratio = Decimal::ONE - Decimal::from(total_discount) / Decimal::from(total);

    let mut lines = cart
        .lines
        .iter()
        .map(|l| {
            Ok(AllocatedLine {
                product_id: l.product_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
                discounted_unit_price: scale(l.unit_price, ratio)?,
            })
        })
        .collect::<Result<Vec<_>, PricingError>>()?;

    // Per-line rounding can take a near-free cart to zero; the cart still
    // charges at least MIN_CHARGE, raised on the smallest-quantity line
    let charged: i64 = lines.iter().map(AllocatedLine::line_total).sum();
    if charged < MIN_CHARGE
        && let Some(line) = lines
            .iter_mut()
            .filter(|l| l.quantity > 0)
            .min_by_key(|l| l.quantity)
    {
        let quantity = i64::from(line.quantity);
        let floor = (MIN_CHARGE - charged + line.line_total() + quantity - 1) / quantity;
        line.discounted_unit_price = line.discounted_unit_price.max(floor);
    }

    Ok(Allocation {
        lines,
        discounted_product_id: None,
        total_discount,
    })
}

fn allocate_single_product(
    cart: &Cart,
    code: &DiscountCode,
    categories: &CategoryIndex,
) -> Result<Allocation, PricingError> {
    let empty = Vec::new();
    let matched = cart.lines.iter().position(|l| {
        let line_categories = categories.get(&l.product_id).unwrap_or(&empty);
        code.applies_to(l.product_id, line_categories)
    });

    let mut allocation = Allocation::none(cart);
    let Some(index) = matched else {
        return Ok(allocation);
    };

    let line = &mut allocation.lines[index];
    let per_unit = discount_per_unit(line.unit_price, code)?;
    line.discounted_unit_price = (line.unit_price - per_unit).max(0);

    allocation.total_discount = per_unit * i64::from(line.quantity);
    allocation.discounted_product_id = Some(line.product_id);
    Ok(allocation)
}

/// Per-unit discount for a scoped code. FIXED discounts are capped at the
/// unit price and are not clamped to a minimum charge.
fn discount_per_unit(unit_price: i64, code: &DiscountCode) -> Result<i64, PricingError> {
    match code.discount_type {
        DiscountType::Percentage => {
            compute_discount(unit_price, code.discount_type, code.discount_amount)
        }
        DiscountType::Fixed => {
            let amount = code
                .discount_amount
                .checked_mul(MINOR_UNITS)
                .ok_or(PricingError::Overflow)?;
            Ok(amount.min(unit_price))
        }
    }
}
