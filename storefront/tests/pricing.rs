//! Discount pricing through the public crate API

use chrono::Utc;
use shared::models::{Cart, CartLine, DiscountCode, DiscountType};
use storefront::pricing::{CategoryIndex, PricingError, allocate, compute_discounted_amount};
use uuid::Uuid;

fn code(discount_type: DiscountType, amount: i64) -> DiscountCode {
    DiscountCode {
        id: Uuid::new_v4(),
        code: "TEST".to_string(),
        discount_type,
        discount_amount: amount,
        all_products: true,
        product_ids: vec![],
        category_ids: vec![],
        limit: None,
        uses: 0,
        expires_at: None,
        is_active: true,
        created_at: Utc::now(),
        stripe_coupon_id: None,
    }
}

fn line(product_id: Uuid, unit_price: i64, quantity: i32) -> CartLine {
    CartLine {
        product_id,
        unit_price,
        quantity,
        name: String::new(),
        thumbnail: None,
    }
}

#[test]
fn whole_cart_percentage_discounts_every_line() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let cart = Cart::new(vec![line(a, 10000, 1), line(b, 5000, 2)]);

    let allocation = allocate(
        &cart,
        &code(DiscountType::Percentage, 20),
        &CategoryIndex::new(),
    )
    .unwrap();

    assert_eq!(allocation.lines[0].discounted_unit_price, 8000);
    assert_eq!(allocation.lines[1].discounted_unit_price, 4000);
    assert_eq!(allocation.subtotal(), 20000);
    assert_eq!(allocation.total(), 16000);
    assert_eq!(allocation.total_discount, 4000);
}

#[test]
fn scoped_code_touches_only_matching_line() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let cart = Cart::new(vec![line(a, 10000, 1), line(b, 5000, 2)]);
    let mut scoped = code(DiscountType::Fixed, 10);
    scoped.all_products = false;
    scoped.product_ids = vec![b];

    let allocation = allocate(&cart, &scoped, &CategoryIndex::new()).unwrap();

    assert_eq!(allocation.lines[0].discounted_unit_price, 10000);
    assert_eq!(allocation.lines[1].discounted_unit_price, 4000);
    assert_eq!(allocation.discounted_product_id, Some(b));
    assert_eq!(allocation.total_discount, 2000);
}

#[test]
fn scoped_code_matches_through_category() {
    let (a, category) = (Uuid::new_v4(), Uuid::new_v4());
    let cart = Cart::new(vec![line(a, 3000, 1)]);
    let mut scoped = code(DiscountType::Percentage, 50);
    scoped.all_products = false;
    scoped.category_ids = vec![category];
    let categories = CategoryIndex::from([(a, vec![category])]);

    let allocation = allocate(&cart, &scoped, &categories).unwrap();

    assert_eq!(allocation.total(), 1500);
}

#[test]
fn fixed_discount_on_single_price() {
    assert_eq!(compute_discounted_amount(2000, DiscountType::Fixed, 5), Ok(1500));
}

#[test]
fn discount_never_makes_a_product_free() {
    assert_eq!(compute_discounted_amount(1000, DiscountType::Fixed, 50), Ok(1));
    assert_eq!(compute_discounted_amount(1000, DiscountType::Percentage, 100), Ok(1));
}

#[test]
fn percentage_rounds_up_to_the_cent() {
    // 999 * 0.85 = 849.15
    assert_eq!(compute_discounted_amount(999, DiscountType::Percentage, 15), Ok(850));
}

#[test]
fn non_positive_base_is_rejected() {
    assert_eq!(
        compute_discounted_amount(0, DiscountType::Percentage, 10),
        Err(PricingError::InvalidAmount(0))
    );
}
