//! # Domain Types
//!
//! Core domain types used throughout Kasir POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog (CRUD-owned)          Sales (append-only)                      │
//! │  ┌─────────────────┐           ┌──────────────────────┐                 │
//! │  │    Category     │◄──┐       │     Transaction      │                 │
//! │  │  id, name       │   │       │  id, total_cents     │                 │
//! │  └─────────────────┘   │       │  created_at          │                 │
//! │  ┌─────────────────┐   │       │  details ─────────┐  │                 │
//! │  │    Product      │───┘       └───────────────────┼──┘                 │
//! │  │  id, name       │                               ▼                    │
//! │  │  price_cents    │◄──────────  TransactionDetail                      │
//! │  │  stock          │             product_id, quantity, subtotal_cents   │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  OrderLine  (request input)     DailyReport (derived, never stored)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pricing
//! A detail's subtotal is computed from the product price at the moment of
//! sale and stored. Later price changes never rewrite history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Category
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    /// Store-assigned identifier.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Optional free-form description.
    pub description: Option<String>,
}

/// Input for creating or updating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Store-assigned identifier.
    pub id: i64,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Category this product belongs to.
    pub category_id: i64,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if `quantity` units can be taken from current stock.
    #[inline]
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// Input for creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    pub category_id: i64,
}

// =============================================================================
// Order Line
// =============================================================================

/// One entry of a cart: which product and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        OrderLine {
            product_id,
            quantity,
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A committed sale.
///
/// ## Invariants
/// - `total_cents == details.iter().map(|d| d.subtotal_cents).sum()`
/// - `details` is never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned identifier.
    pub id: i64,

    /// Sum of detail subtotals, in cents.
    pub total_cents: i64,

    /// Commit time, assigned by the store.
    pub created_at: DateTime<Utc>,

    /// Line items in cart order.
    pub details: Vec<TransactionDetail>,
}

impl Transaction {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Recomputes the total from the details.
    pub fn details_total(&self) -> Money {
        self.details.iter().map(TransactionDetail::subtotal).sum()
    }
}

/// A line item of a committed sale.
/// The subtotal is frozen at the unit price in effect when the sale committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionDetail {
    pub id: i64,
    pub transaction_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// unit price × quantity at time of sale.
    pub subtotal_cents: i64,
}

impl TransactionDetail {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Daily Report
// =============================================================================

/// Sales totals for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub total_sales_cents: i64,
    pub transaction_count: i64,
}

impl DailyReport {
    /// A report for a day with no sales.
    pub fn empty(date: NaiveDate) -> Self {
        DailyReport {
            date,
            total_sales_cents: 0,
            transaction_count: 0,
        }
    }

    #[inline]
    pub fn total_sales(&self) -> Money {
        Money::from_cents(self.total_sales_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(id: i64, subtotal_cents: i64) -> TransactionDetail {
        TransactionDetail {
            id,
            transaction_id: 1,
            product_id: id,
            quantity: 1,
            subtotal_cents,
        }
    }

    #[test]
    fn test_product_stock_check() {
        let product = Product {
            id: 1,
            name: "Kopi".to_string(),
            price_cents: 1000,
            stock: 5,
            category_id: 1,
        };
        assert!(product.has_stock_for(5));
        assert!(!product.has_stock_for(6));
        assert_eq!(product.price(), Money::from_cents(1000));
    }

    #[test]
    fn test_transaction_details_total() {
        let tx = Transaction {
            id: 1,
            total_cents: 2700,
            created_at: Utc::now(),
            details: vec![detail(1, 2000), detail(2, 700)],
        };
        assert_eq!(tx.details_total(), tx.total());
    }

    #[test]
    fn test_daily_report_serializes_date() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let json = serde_json::to_value(DailyReport::empty(date)).unwrap();
        assert_eq!(json["date"], "2026-01-31");
        assert_eq!(json["total_sales_cents"], 0);
        assert_eq!(json["transaction_count"], 0);
    }

    #[test]
    fn test_product_input_stock_defaults_to_zero() {
        let input: ProductInput =
            serde_json::from_str(r#"{"name":"Teh","price_cents":500,"category_id":1}"#).unwrap();
        assert_eq!(input.stock, 0);
    }
}
