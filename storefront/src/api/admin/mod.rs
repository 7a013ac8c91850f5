//! Back-office API (admin JWT required)

mod dashboard;
mod discount_codes;
mod orders;
mod products;
mod users;

pub use dashboard::dashboard;
pub use discount_codes::{
    DiscountCodeError, create_discount_code, delete_discount_code, list_discount_codes,
    toggle_discount_code, update_discount_code,
};
pub use orders::{delete_order, list_orders};
pub use products::{
    create_category, create_product, delete_product, list_categories, list_products,
    set_availability, update_product,
};
pub use users::{delete_user, list_users};
