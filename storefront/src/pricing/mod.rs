//! Discount pricing engine
//!
//! Pure discount math, coupon eligibility and per-line allocation. Nothing
//! here touches the network; eligibility reads through [`crate::store`].

pub mod allocator;
pub mod calculator;
pub mod eligibility;

pub use allocator::{AllocatedLine, Allocation, CategoryIndex, allocate};
pub use calculator::{PricingError, compute_discount, compute_discounted_amount, parse_discount_type};
pub use eligibility::{
    ContextLine, Eligibility, EligibilityContext, Ineligible, check_usable, evaluate,
};
