//! Product Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Catalog product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Price in minor units, always > 0
    pub price_in_cents: i64,
    pub image_path: String,
    pub is_available_for_purchase: bool,
    pub category_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// Create category payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Create / replace product payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(range(min = 1))]
    pub price_in_cents: i64,
    #[validate(length(min = 1))]
    pub image_path: String,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
    #[serde(default)]
    pub is_available_for_purchase: bool,
}

/// Toggle availability payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAvailability {
    pub is_available_for_purchase: bool,
}

/// Admin product listing row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductListItem {
    pub id: Uuid,
    pub name: String,
    pub price_in_cents: i64,
    pub is_available_for_purchase: bool,
    pub order_count: i64,
}
