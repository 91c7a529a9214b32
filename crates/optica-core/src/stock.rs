//! # Stock Snapshot
//!
//! Per-product stock levels as last fetched from the backend.
//!
//! ## Availability
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock     = units the business owns                                   │
//! │  reserved  = units promised to other in-flight orders                  │
//! │  available = stock - reserved   ← the only number the cart checks      │
//! │                                                                         │
//! │  Snapshot is PULLED: fetched on mount and after a successful checkout. │
//! │  Between fetches it may be stale; the backend stays authoritative.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::types::ProductId;

// =============================================================================
// Stock Level
// =============================================================================

/// Stock figures for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: ProductId,
    /// Total owned units.
    pub stock: i64,
    /// Units committed to other in-flight orders.
    #[serde(default)]
    pub reserved: i64,
}

impl StockLevel {
    pub fn new(product_id: ProductId, stock: i64, reserved: i64) -> Self {
        StockLevel {
            product_id,
            stock,
            reserved,
        }
    }

    /// `stock - reserved`, floored at zero.
    #[inline]
    pub fn available(&self) -> i64 {
        (self.stock - self.reserved).max(0)
    }
}

// =============================================================================
// Stock Snapshot
// =============================================================================

/// The latest fetched stock levels, keyed by product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSnapshot {
    levels: HashMap<ProductId, StockLevel>,
    fetched_at: DateTime<Utc>,
}

impl StockSnapshot {
    /// An empty snapshot: every product reads as out of stock.
    pub fn empty() -> Self {
        StockSnapshot {
            levels: HashMap::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Builds a snapshot from provider rows. A later row for the same product
    /// replaces an earlier one.
    pub fn from_levels<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = StockLevel>,
    {
        StockSnapshot {
            levels: levels.into_iter().map(|l| (l.product_id, l)).collect(),
            fetched_at: Utc::now(),
        }
    }

    /// Units purchasable right now. Unknown products are out of stock,
    /// never unlimited.
    #[inline]
    pub fn available(&self, product_id: ProductId) -> i64 {
        self.levels
            .get(&product_id)
            .map(StockLevel::available)
            .unwrap_or(0)
    }

    /// The raw level for a product, if present.
    pub fn level(&self, product_id: ProductId) -> Option<&StockLevel> {
        self.levels.get(&product_id)
    }

    /// Total owned units, ignoring reservations (0 when unknown).
    pub fn stock(&self, product_id: ProductId) -> i64 {
        self.levels.get(&product_id).map_or(0, |l| l.stock)
    }

    /// When this snapshot was taken.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Number of products in the snapshot.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Iterates over all levels in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &StockLevel> {
        self.levels.values()
    }
}

impl Default for StockSnapshot {
    fn default() -> Self {
        StockSnapshot::empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
