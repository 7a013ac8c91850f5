//! Back-office dashboard figures

use axum::{Json, extract::State};
use serde::Serialize;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SalesStats {
    pub count: i64,
    pub total_in_cents: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CustomerStats {
    pub count: i64,
    pub average_value_per_customer_in_cents: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProductStats {
    pub available: i64,
    pub unavailable: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub sales: SalesStats,
    pub customers: CustomerStats,
    pub products: ProductStats,
}

impl DashboardStats {
    fn from_totals(
        (order_count, total_in_cents): (i64, i64),
        customer_count: i64,
        (available, unavailable): (i64, i64),
    ) -> Self {
        let average = if customer_count == 0 {
            0
        } else {
            total_in_cents / customer_count
        };
        Self {
            sales: SalesStats {
                count: order_count,
                total_in_cents,
            },
            customers: CustomerStats {
                count: customer_count,
                average_value_per_customer_in_cents: average,
            },
            products: ProductStats {
                available,
                unavailable,
            },
        }
    }
}

/// GET /api/admin/dashboard
pub async fn dashboard(State(state): State<AppState>) -> ServiceResult<Json<DashboardStats>> {
    let (sales, customers, products) = futures::try_join!(
        db::orders::sales_totals(&state.pool),
        db::users::count(&state.pool),
        db::products::availability_counts(&state.pool),
    )?;
    Ok(Json(DashboardStats::from_totals(sales, customers, products)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_per_customer() {
        let stats = DashboardStats::from_totals((3, 30000), 2, (5, 1));
        assert_eq!(stats.customers.average_value_per_customer_in_cents, 15000);
        assert_eq!(stats.sales.count, 3);
        assert_eq!(stats.products.unavailable, 1);
    }

    #[test]
    fn test_no_customers_means_zero_average() {
        let stats = DashboardStats::from_totals((0, 0), 0, (0, 0));
        assert_eq!(stats.customers.average_value_per_customer_in_cents, 0);
    }
}
