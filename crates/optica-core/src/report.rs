//! # Reports
//!
//! Figures for the admin "Ventas / Reportes" screen: the three KPI cards
//! and the low-stock list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::stock::StockSnapshot;
use crate::types::{PaymentMethod, Product, ProductId};

// =============================================================================
// Sales
// =============================================================================

/// A stored sale as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub customer_name: String,
    pub payment_method: Option<PaymentMethod>,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
}

/// The KPI cards: number of sales, income, and average ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub count: usize,
    pub income: Money,
    /// Income / count, rounded half-up to the centavo. Zero with no sales.
    pub average: Money,
}

impl SalesSummary {
    pub fn from_sales(sales: &[SaleRecord]) -> Self {
        let count = sales.len();
        let income: Money = sales.iter().map(|s| s.total).sum();

        let average = if count == 0 {
            Money::zero()
        } else {
            let n = count as i128;
            let cents = income.cents() as i128;
            let rounded = if cents >= 0 {
                (2 * cents + n) / (2 * n)
            } else {
                (2 * cents - n) / (2 * n)
            };
            Money::from_cents(rounded as i64)
        };

        SalesSummary {
            count,
            income,
            average,
        }
    }
}

// =============================================================================
// Low Stock
// =============================================================================

/// A product at or below its minimum stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LowStockEntry {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub stock: i64,
    pub min_stock: i64,
}

/// Products whose owned stock is at or below `min_stock`, most critical first
/// (stock ascending, then SKU).
///
/// Reserved units are ignored: the list is about replenishing what the
/// business owns.
pub fn low_stock(products: &[Product], snapshot: &StockSnapshot) -> Vec<LowStockEntry> {
    let mut entries: Vec<LowStockEntry> = products
        .iter()
        .filter_map(|p| {
            let stock = snapshot.stock(p.id);
            (stock <= p.min_stock).then(|| LowStockEntry {
                product_id: p.id,
                sku: p.sku.clone(),
                name: p.name.clone(),
                stock,
                min_stock: p.min_stock,
            })
        })
        .collect();

    entries.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.sku.cmp(&b.sku)));
    entries
}

// =============================================================================
// Unit Tests
// =============================================================================
