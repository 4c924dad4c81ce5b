//! # Order Pricing
//!
//! Turns validated cart lines plus the products they reference into an
//! [`OrderDraft`]: priced lines and a grand total, ready for the atomic commit.
//!
//! ## Pricing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart: [{A, 2}, {B, 2}]                                                 │
//! │     │                                                                   │
//! │     ▼  for each line, in cart order                                     │
//! │  add_line(product A @ 10.00, stock 5, qty 2)                            │
//! │     ├── stock 5 >= 2 (cumulative for A)       ✅                        │
//! │     └── subtotal 20.00, total 20.00                                     │
//! │  add_line(product B @ 3.50, stock 2, qty 2)                             │
//! │     ├── stock 2 >= 2 (cumulative for B)       ✅                        │
//! │     └── subtotal 7.00, total 27.00                                      │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  OrderDraft { lines: [..], total: 27.00 }                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here touches storage. The draft is a plan; the database layer
//! re-checks stock inside its transaction when applying it.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::validate_quantity;

/// A cart line with its price captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl PricedLine {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// A priced, stock-checked order that has not been committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDraft {
    lines: Vec<PricedLine>,
    total: Money,
    requested: HashMap<i64, i64>,
}

impl OrderDraft {
    pub fn new() -> Self {
        OrderDraft::default()
    }

    /// Prices one cart line against the product as currently stocked.
    ///
    /// ## Errors
    /// - `Validation` if `quantity <= 0`
    /// - `InsufficientStock` if the product's stock cannot cover this line
    ///   plus every earlier line for the same product
    /// - `TotalOverflow` if the subtotal or running total overflows
    ///
    /// On error the draft is left unchanged.
    pub fn add_line(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        let already = self.requested.get(&product.id).copied().unwrap_or(0);
        let requested = already
            .checked_add(quantity)
            .ok_or(CoreError::TotalOverflow)?;

        if !product.has_stock_for(requested) {
            return Err(CoreError::InsufficientStock {
                product_id: product.id,
                available: product.stock,
                requested,
            });
        }

        let subtotal = product
            .price()
            .checked_multiply_quantity(quantity)
            .ok_or(CoreError::TotalOverflow)?;
        let total = self
            .total
            .checked_add(subtotal)
            .ok_or(CoreError::TotalOverflow)?;

        self.lines.push(PricedLine {
            product_id: product.id,
            quantity,
            unit_price_cents: product.price_cents,
            subtotal_cents: subtotal.cents(),
        });
        self.total = total;
        self.requested.insert(product.id, requested);

        Ok(())
    }

    /// Priced lines in cart order.
    pub fn lines(&self) -> &[PricedLine] {
        &self.lines
    }

    /// Sum of all line subtotals.
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total quantity requested for one product across all lines.
    pub fn requested_quantity(&self, product_id: i64) -> i64 {
        self.requested.get(&product_id).copied().unwrap_or(0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
